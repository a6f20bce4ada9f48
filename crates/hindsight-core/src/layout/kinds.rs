//! Per-kind constant groups.
//!
//! Names are the `v8dbg_` symbols without their prefix. Where V8 renamed a
//! symbol over time, every known spelling is listed newest first.

use super::{Constant, Field, Loader, Repr};

#[derive(Debug, Clone)]
pub struct CommonLayout
{
    /// Size of a tagged slot in bytes.
    pub pointer_size: usize,
}

impl CommonLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        let log2 = loader.constant(&["PointerSizeLog2"]).value().unwrap_or(3);
        let pointer_size = u32::try_from(log2).ok().and_then(|shift| 1usize.checked_shl(shift)).unwrap_or(8);
        Self { pointer_size }
    }
}

/// Small-integer tagging. Classification must be total, so these fall back
/// to V8's 64-bit defaults when a build does not export them.
#[derive(Debug, Clone)]
pub struct SmiLayout
{
    pub tag: Constant,
    pub tag_mask: Constant,
    pub shift_size: Constant,
}

impl SmiLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            tag: loader.constant_or(&["SmiTag"], 0),
            tag_mask: loader.constant_or(&["SmiTagMask"], 1),
            shift_size: loader.constant_or(&["SmiShiftSize"], 31),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeapObjectLayout
{
    pub tag: Constant,
    pub tag_mask: Constant,
    pub map: Constant,
}

impl HeapObjectLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            tag: loader.constant_or(&["HeapObjectTag"], 1),
            tag_mask: loader.constant_or(&["HeapObjectTagMask"], 3),
            map: loader.tagged(&["class_HeapObject__map__Map"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapLayout
{
    /// Two-byte instance type (newer builds).
    pub instance_type: Field,
    /// Packed attributes whose low byte is the instance type (older builds).
    pub instance_attributes: Field,
    pub constructor: Constant,
    pub descriptors: Constant,
    pub bit_field3: Field,
    /// In-object property count, or the first in-object word when
    /// `in_object_is_start` is set.
    pub in_object_properties: Field,
    pub in_object_is_start: bool,
    /// Instance size in words.
    pub instance_size: Field,
    pub dictionary_map_shift: Constant,
    pub own_descriptors_shift: Constant,
    pub own_descriptors_mask: Constant,
}

impl MapLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        let start = loader.field(&[(
            "class_Map__inobject_properties_start_or_constructor_function_index__char",
            Repr::Uint8,
        )]);
        let (in_object_properties, in_object_is_start) = if start.is_available() {
            (start, true)
        } else {
            let count = loader.field(&[
                ("class_Map__inobject_properties_or_constructor_function_index__int", Repr::Uint8),
                ("class_Map__inobject_properties__int", Repr::Uint8),
            ]);
            (count, false)
        };

        Self {
            instance_type: loader.field(&[("class_Map__instance_type__uint16_t", Repr::Uint16)]),
            instance_attributes: loader.field(&[("class_Map__instance_attributes__int", Repr::Uint8)]),
            constructor: loader.tagged(&[
                "class_Map__constructor_or_backpointer__Object",
                "class_Map__constructor__Object",
            ]),
            descriptors: loader.tagged(&["class_Map__instance_descriptors__DescriptorArray"]),
            bit_field3: loader.field(&[
                ("class_Map__bit_field3__int", Repr::Int32),
                ("class_Map__bit_field3__SMI", Repr::Smi),
            ]),
            in_object_properties,
            in_object_is_start,
            instance_size: loader.field(&[
                ("class_Map__instance_size_in_words__char", Repr::Uint8),
                ("class_Map__instance_size__int", Repr::Uint8),
            ]),
            dictionary_map_shift: loader.constant(&["bit_field3_dictionary_map_shift", "bit_field3_is_dictionary_map_shift"]),
            own_descriptors_shift: loader.constant(&["bit_field3_number_of_own_descriptors_shift"]),
            own_descriptors_mask: loader.constant(&["bit_field3_number_of_own_descriptors_mask"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsObjectLayout
{
    pub properties: Constant,
    pub elements: Constant,
    /// First embedder (internal) field; derived from `elements` when not exported.
    pub internal_fields: Constant,
}

impl JsObjectLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>, common: &CommonLayout) -> Self
    {
        let properties = loader.tagged(&[
            "class_JSReceiver__raw_properties_or_hash__Object",
            "class_JSReceiver__properties__FixedArray",
            "class_JSObject__properties__FixedArray",
        ]);
        let elements = loader.tagged(&["class_JSObject__elements__Object", "class_JSObject__elements__FixedArray"]);
        let derived = elements.raw() + common.pointer_size as i64;
        let internal_fields = if elements.is_available() {
            loader.constant_or(&["class_JSObject__internal_fields__uintptr_t"], derived)
        } else {
            loader.constant(&["class_JSObject__internal_fields__uintptr_t"])
        };

        Self {
            properties,
            elements,
            internal_fields,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeapNumberLayout
{
    pub value: Constant,
}

impl HeapNumberLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            value: loader.constant(&["class_HeapNumber__value__double"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsArrayLayout
{
    pub length: Field,
}

impl JsArrayLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            length: loader.field(&[
                ("class_JSArray__length__Object", Repr::Smi),
                ("class_JSArray__length__SMI", Repr::Smi),
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsFunctionLayout
{
    pub shared: Constant,
    pub context: Constant,
}

impl JsFunctionLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            shared: loader.tagged(&["class_JSFunction__shared__SharedFunctionInfo"]),
            context: loader.tagged(&["class_JSFunction__context__Context"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SharedInfoLayout
{
    pub name: Constant,
    pub name_or_scope_info: Constant,
    pub inferred_name: Constant,
    pub script: Constant,
    pub scope_info: Constant,
    pub start_position: Field,
    pub start_position_shift: Constant,
    pub end_position: Field,
    pub parameter_count: Field,
}

impl SharedInfoLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            name: loader.tagged(&["class_SharedFunctionInfo__raw_name__Object", "class_SharedFunctionInfo__name__Object"]),
            name_or_scope_info: loader.tagged(&["class_SharedFunctionInfo__name_or_scope_info__Object"]),
            inferred_name: loader.tagged(&[
                "class_SharedFunctionInfo__inferred_name__String",
                "class_SharedFunctionInfo__function_identifier__Object",
            ]),
            script: loader.tagged(&[
                "class_SharedFunctionInfo__script__Object",
                "class_SharedFunctionInfo__script_or_debug_info__Object",
            ]),
            scope_info: loader.tagged(&["class_SharedFunctionInfo__scope_info__ScopeInfo"]),
            start_position: loader.field(&[
                ("class_SharedFunctionInfo__start_position_and_type__int", Repr::Int32),
                ("class_SharedFunctionInfo__start_position_and_type__SMI", Repr::Smi),
            ]),
            start_position_shift: loader.constant_or(&["sharedfunctioninfo_start_position_shift"], 0),
            end_position: loader.field(&[
                ("class_SharedFunctionInfo__end_position__int", Repr::Int32),
                ("class_SharedFunctionInfo__end_position__SMI", Repr::Smi),
            ]),
            parameter_count: loader.field(&[
                ("class_SharedFunctionInfo__internal_formal_parameter_count__uint16_t", Repr::Uint16),
                ("class_SharedFunctionInfo__internal_formal_parameter_count__int", Repr::Int32),
                ("class_SharedFunctionInfo__internal_formal_parameter_count__SMI", Repr::Smi),
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptLayout
{
    pub name: Constant,
    pub line_offset: Field,
    pub source: Constant,
    pub line_ends: Constant,
}

impl ScriptLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            name: loader.tagged(&["class_Script__name__Object"]),
            line_offset: loader.field(&[("class_Script__line_offset__SMI", Repr::Smi)]),
            source: loader.tagged(&["class_Script__source__Object"]),
            line_ends: loader.tagged(&["class_Script__line_ends__Object"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StringLayout
{
    pub encoding_mask: Constant,
    pub representation_mask: Constant,
    pub one_byte_tag: Constant,
    pub two_byte_tag: Constant,
    pub seq_tag: Constant,
    pub cons_tag: Constant,
    pub sliced_tag: Constant,
    pub external_tag: Constant,
    pub thin_tag: Constant,
    pub length: Field,
    pub one_byte_chars: Constant,
    pub two_byte_chars: Constant,
    pub cons_first: Constant,
    pub cons_second: Constant,
    pub sliced_parent: Constant,
    pub sliced_offset: Field,
    pub thin_actual: Constant,
}

impl StringLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            encoding_mask: loader.constant(&["StringEncodingMask"]),
            representation_mask: loader.constant(&["StringRepresentationMask"]),
            one_byte_tag: loader.constant(&["OneByteStringTag", "AsciiStringTag"]),
            two_byte_tag: loader.constant(&["TwoByteStringTag"]),
            seq_tag: loader.constant(&["SeqStringTag"]),
            cons_tag: loader.constant(&["ConsStringTag"]),
            sliced_tag: loader.constant(&["SlicedStringTag"]),
            external_tag: loader.constant(&["ExternalStringTag"]),
            thin_tag: loader.constant(&["ThinStringTag"]),
            length: loader.field(&[
                ("class_String__length__int32_t", Repr::Int32),
                ("class_String__length__SMI", Repr::Smi),
            ]),
            one_byte_chars: loader.constant(&["class_SeqOneByteString__chars__char", "class_SeqAsciiString__chars__char"]),
            two_byte_chars: loader.constant(&["class_SeqTwoByteString__chars__char"]),
            cons_first: loader.tagged(&["class_ConsString__first__String"]),
            cons_second: loader.tagged(&["class_ConsString__second__String"]),
            sliced_parent: loader.tagged(&["class_SlicedString__parent__String"]),
            sliced_offset: loader.field(&[("class_SlicedString__offset__SMI", Repr::Smi)]),
            thin_actual: loader.tagged(&["class_ThinString__actual__String"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedArrayLayout
{
    pub length: Field,
    /// First element slot; derived from `length` when not exported.
    pub data: Constant,
}

impl FixedArrayLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>, common: &CommonLayout) -> Self
    {
        let length = loader.field(&[("class_FixedArrayBase__length__SMI", Repr::Smi)]);
        let derived = length.offset.raw() + common.pointer_size as i64;
        let data = if length.is_available() {
            loader.constant_or(&["class_FixedArray__data__uintptr_t"], derived)
        } else {
            loader.constant(&["class_FixedArray__data__uintptr_t"])
        };
        Self { length, data }
    }
}

#[derive(Debug, Clone)]
pub struct FixedTypedArrayLayout
{
    pub base_pointer: Constant,
    pub external_pointer: Constant,
}

impl FixedTypedArrayLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            base_pointer: loader.tagged(&["class_FixedTypedArrayBase__base_pointer__Object"]),
            external_pointer: loader.constant(&[
                "class_FixedTypedArrayBase__external_pointer__Object",
                "class_FixedTypedArrayBase__external_pointer__uintptr_t",
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OddballLayout
{
    pub kind: Field,
    pub exception: Constant,
    pub false_: Constant,
    pub true_: Constant,
    pub undefined: Constant,
    pub null: Constant,
    pub the_hole: Constant,
    pub uninitialized: Constant,
}

impl OddballLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            kind: loader.field(&[
                ("class_Oddball__kind_offset__int", Repr::Smi),
                ("class_Oddball__kind__SMI", Repr::Smi),
            ]),
            exception: loader.constant(&["OddballException"]),
            false_: loader.constant(&["OddballFalse"]),
            true_: loader.constant(&["OddballTrue"]),
            undefined: loader.constant(&["OddballUndefined"]),
            null: loader.constant(&["OddballNull"]),
            the_hole: loader.constant(&["OddballTheHole"]),
            uninitialized: loader.constant(&["OddballUninitialized"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayBufferLayout
{
    pub backing_store: Constant,
    pub byte_length: Field,
    pub bit_field: Field,
    pub was_neutered_mask: Constant,
    pub was_neutered_shift: Constant,
}

impl ArrayBufferLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            backing_store: loader.constant(&[
                "class_JSArrayBuffer__backing_store__Object",
                "class_JSArrayBuffer__backing_store__uintptr_t",
            ]),
            byte_length: loader.field(&[
                ("class_JSArrayBuffer__byte_length__size_t", Repr::Word),
                ("class_JSArrayBuffer__byte_length__Object", Repr::Smi),
            ]),
            bit_field: loader.field(&[
                ("class_JSArrayBuffer__bit_field__uint32_t", Repr::Int32),
                ("class_JSArrayBuffer__bit_field__int", Repr::Int32),
            ]),
            was_neutered_mask: loader.constant(&["jsarray_buffer_was_neutered_mask", "jsarray_buffer_was_detached_mask"]),
            was_neutered_shift: loader.constant_or(
                &["jsarray_buffer_was_neutered_shift", "jsarray_buffer_was_detached_shift"],
                0,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayBufferViewLayout
{
    pub buffer: Constant,
    pub byte_offset: Field,
    pub byte_length: Field,
}

impl ArrayBufferViewLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            buffer: loader.tagged(&["class_JSArrayBufferView__buffer__Object"]),
            byte_offset: loader.field(&[
                ("class_JSArrayBufferView__byte_offset__size_t", Repr::Word),
                ("class_JSArrayBufferView__raw_byte_offset__Object", Repr::Smi),
            ]),
            byte_length: loader.field(&[
                ("class_JSArrayBufferView__byte_length__size_t", Repr::Word),
                ("class_JSArrayBufferView__raw_byte_length__Object", Repr::Smi),
            ]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegExpLayout
{
    pub source: Constant,
}

impl RegExpLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            source: loader.tagged(&["class_JSRegExp__source__Object"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DateLayout
{
    pub value: Constant,
}

impl DateLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            value: loader.tagged(&["class_JSDate__value__Object"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolLayout
{
    pub name: Constant,
}

impl SymbolLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            name: loader.tagged(&["class_Symbol__name__Object", "class_Symbol__description__Object"]),
        }
    }
}

/// Descriptor entries are triples of slots inside a FixedArray-shaped object.
///
/// Details words come in two encodings: older builds carry a property type
/// (`field`, `const_field`, `constant`), newer ones a location (`field` or
/// `descriptor`). Whichever set resolved decides how details are read.
#[derive(Debug, Clone)]
pub struct DescriptorArrayLayout
{
    pub first_index: Constant,
    pub entry_size: Constant,
    pub details_slot: Constant,
    pub key_slot: Constant,
    pub value_slot: Constant,
    pub index_mask: Constant,
    pub index_shift: Constant,
    pub representation_mask: Constant,
    pub representation_shift: Constant,
    pub representation_double: Constant,
    pub type_mask: Constant,
    pub type_field: Constant,
    pub type_const_field: Constant,
    pub type_constant: Constant,
    pub location_mask: Constant,
    pub location_shift: Constant,
    pub location_field: Constant,
    pub location_descriptor: Constant,
}

impl DescriptorArrayLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            first_index: loader.constant(&["prop_idx_first"]),
            entry_size: loader.constant(&["prop_desc_size"]),
            details_slot: loader.constant(&["prop_desc_details"]),
            key_slot: loader.constant(&["prop_desc_key"]),
            value_slot: loader.constant(&["prop_desc_value"]),
            index_mask: loader.constant(&["prop_index_mask"]),
            index_shift: loader.constant(&["prop_index_shift"]),
            representation_mask: loader.constant(&["prop_representation_mask"]),
            representation_shift: loader.constant(&["prop_representation_shift"]),
            representation_double: loader.constant(&["prop_representation_double"]),
            type_mask: loader.constant(&["prop_type_mask"]),
            type_field: loader.constant(&["prop_type_field"]),
            type_const_field: loader.constant(&["prop_type_const_field"]),
            type_constant: loader.constant(&["prop_type_constant"]),
            location_mask: loader.constant(&["prop_location_mask"]),
            location_shift: loader.constant_or(&["prop_location_shift"], 0),
            location_field: loader.constant(&["prop_location_Field"]),
            location_descriptor: loader.constant(&["prop_location_Descriptor"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NameDictionaryLayout
{
    pub entry_size: Constant,
    pub prefix_start: Constant,
    pub prefix_size: Constant,
}

impl NameDictionaryLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            entry_size: loader.constant(&[
                "class_NameDictionaryShape__entry_size__int",
                "namedictionaryshape_entry_size",
            ]),
            prefix_start: loader.constant_or(
                &[
                    "class_NameDictionaryShape__prefix_start_index__int",
                    "namedictionaryshape_prefix_start_index",
                ],
                0,
            ),
            prefix_size: loader.constant(&[
                "class_NameDictionaryShape__prefix_size__int",
                "namedictionaryshape_prefix_size",
            ]),
        }
    }

    /// Slot of the first entry, past the dictionary's header slots.
    #[must_use]
    pub fn first_entry(&self) -> Option<i64>
    {
        Some(self.prefix_start.value()? + self.prefix_size.value()?)
    }
}

#[derive(Debug, Clone)]
pub struct ContextLayout
{
    pub closure_index: Constant,
    pub previous_index: Constant,
    pub scope_info_index: Constant,
    pub min_context_slots: Constant,
}

impl ContextLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            closure_index: loader.constant(&["class_Context__closure_index__int", "context_idx_closure"]),
            previous_index: loader.constant(&["class_Context__previous_index__int", "context_idx_prev"]),
            scope_info_index: loader.constant(&["context_idx_scope_info", "class_Context__scope_info_index__int"]),
            min_context_slots: loader.constant(&["class_Context__min_context_slots__int", "context_min_slots"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeInfoLayout
{
    pub parameter_count: Constant,
    pub stack_local_count: Constant,
    pub context_local_count: Constant,
    pub variable_part: Constant,
}

impl ScopeInfoLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            parameter_count: loader.constant(&["scopeinfo_idx_nparams"]),
            stack_local_count: loader.constant(&["scopeinfo_idx_nstacklocals"]),
            context_local_count: loader.constant(&["scopeinfo_idx_ncontextlocals"]),
            variable_part: loader.constant(&["scopeinfo_idx_first_vars"]),
        }
    }

    /// Whether parameter and stack-local names precede the context locals.
    #[must_use]
    pub fn embeds_stack_locals(&self) -> bool
    {
        self.stack_local_count.is_available()
    }
}

#[derive(Debug, Clone)]
pub struct FrameLayout
{
    pub context: Constant,
    pub function: Constant,
    pub args: Constant,
    pub marker: Constant,
    pub adaptor: Constant,
    pub entry: Constant,
    pub entry_construct: Constant,
    pub exit: Constant,
    pub internal: Constant,
    pub construct: Constant,
    pub stub: Constant,
    pub javascript: Constant,
    pub optimized: Constant,
}

impl FrameLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            context: loader.constant(&["off_fp_context"]),
            function: loader.constant(&["off_fp_function"]),
            args: loader.constant(&["off_fp_args"]),
            marker: loader.constant(&["off_fp_marker", "off_fp_context_or_frame_type"]),
            adaptor: loader.constant(&["frametype_ArgumentsAdaptorFrame"]),
            entry: loader.constant(&["frametype_EntryFrame"]),
            entry_construct: loader.constant(&["frametype_ConstructEntryFrame", "frametype_EntryConstructFrame"]),
            exit: loader.constant(&["frametype_ExitFrame"]),
            internal: loader.constant(&["frametype_InternalFrame"]),
            construct: loader.constant(&["frametype_ConstructFrame"]),
            stub: loader.constant(&["frametype_StubFrame"]),
            javascript: loader.constant(&["frametype_JavaScriptFrame"]),
            optimized: loader.constant(&["frametype_OptimizedFrame"]),
        }
    }
}

/// Instance type ids and type-id range boundaries.
#[derive(Debug, Clone)]
pub struct TypeLayout
{
    pub first_nonstring: Constant,
    pub first_js_object: Constant,
    pub first_context: Constant,
    pub last_context: Constant,
    pub heap_number: Constant,
    pub map: Constant,
    pub global_object: Constant,
    pub global_proxy: Constant,
    pub oddball: Constant,
    pub js_object: Constant,
    pub js_api_object: Constant,
    pub js_special_api_object: Constant,
    pub js_error: Constant,
    pub js_array: Constant,
    pub code: Constant,
    pub js_function: Constant,
    pub fixed_array: Constant,
    pub js_array_buffer: Constant,
    pub js_typed_array: Constant,
    pub js_regexp: Constant,
    pub js_date: Constant,
    pub shared_function_info: Constant,
    pub script: Constant,
    pub scope_info: Constant,
    pub symbol: Constant,
    pub descriptor_array: Constant,
    pub name_dictionary: Constant,
}

impl TypeLayout
{
    pub(crate) fn load(loader: &mut Loader<'_>) -> Self
    {
        Self {
            first_nonstring: loader.constant(&["FirstNonstringType"]),
            first_js_object: loader.constant(&["FirstJSObjectType", "type_JSObject__FIRST_JS_OBJECT_TYPE"]),
            first_context: loader.constant(&["FirstContextType"]),
            last_context: loader.constant(&["LastContextType"]),
            heap_number: loader.constant(&["type_HeapNumber__HEAP_NUMBER_TYPE"]),
            map: loader.constant(&["type_Map__MAP_TYPE"]),
            global_object: loader.constant(&[
                "type_JSGlobalObject__JS_GLOBAL_OBJECT_TYPE",
                "type_GlobalObject__GLOBAL_OBJECT_TYPE",
            ]),
            global_proxy: loader.constant(&["type_JSGlobalProxy__JS_GLOBAL_PROXY_TYPE"]),
            oddball: loader.constant(&["type_Oddball__ODDBALL_TYPE"]),
            js_object: loader.constant(&["type_JSObject__JS_OBJECT_TYPE"]),
            js_api_object: loader.constant(&["type_JSAPIObject__JS_API_OBJECT_TYPE", "type_JSObject__JS_API_OBJECT_TYPE"]),
            js_special_api_object: loader.constant(&["type_JSSpecialAPIObject__JS_SPECIAL_API_OBJECT_TYPE"]),
            js_error: loader.constant(&["type_JSError__JS_ERROR_TYPE"]),
            js_array: loader.constant(&["type_JSArray__JS_ARRAY_TYPE"]),
            code: loader.constant(&["type_Code__CODE_TYPE"]),
            js_function: loader.constant(&["type_JSFunction__JS_FUNCTION_TYPE"]),
            fixed_array: loader.constant(&["type_FixedArray__FIXED_ARRAY_TYPE"]),
            js_array_buffer: loader.constant(&["type_JSArrayBuffer__JS_ARRAY_BUFFER_TYPE"]),
            js_typed_array: loader.constant(&["type_JSTypedArray__JS_TYPED_ARRAY_TYPE"]),
            js_regexp: loader.constant(&["type_JSRegExp__JS_REGEXP_TYPE", "type_JSRegExp__JS_REG_EXP_TYPE"]),
            js_date: loader.constant(&["type_JSDate__JS_DATE_TYPE"]),
            shared_function_info: loader.constant(&["type_SharedFunctionInfo__SHARED_FUNCTION_INFO_TYPE"]),
            script: loader.constant(&["type_Script__SCRIPT_TYPE"]),
            scope_info: loader.constant(&["type_ScopeInfo__SCOPE_INFO_TYPE"]),
            symbol: loader.constant(&["type_Symbol__SYMBOL_TYPE"]),
            descriptor_array: loader.constant(&["type_DescriptorArray__DESCRIPTOR_ARRAY_TYPE"]),
            name_dictionary: loader.constant(&["type_NameDictionary__NAME_DICTIONARY_TYPE"]),
        }
    }

    /// Inclusive context type-id range check.
    #[must_use]
    pub fn is_context(&self, type_id: i64) -> bool
    {
        match (self.first_context.value(), self.last_context.value()) {
            (Some(first), Some(last)) => type_id >= first && type_id <= last,
            _ => false,
        }
    }

    /// Ordinary, API and special-API objects.
    #[must_use]
    pub fn is_plain_object(&self, type_id: i64) -> bool
    {
        self.js_object.matches(type_id) || self.js_api_object.matches(type_id) || self.js_special_api_object.matches(type_id)
    }

    /// Strings occupy every type id below the first non-string id.
    #[must_use]
    pub fn is_string(&self, type_id: i64) -> bool
    {
        self.first_nonstring.value().is_some_and(|first| type_id < first)
    }
}
