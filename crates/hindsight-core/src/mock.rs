//! # Synthetic Targets
//!
//! In-memory stand-ins for a core dump and an executable, used by the unit and
//! integration tests (and handy for anyone embedding the decoder).
//!
//! - [`MockMemory`] stores bytes sparsely, counts [`MemoryAccess::read_bytes`]
//!   calls and can poison ranges so reads touching them fail.
//! - [`MockConstants`] is a `v8dbg_` symbol table; [`MockConstants::standard`]
//!   describes a 64-bit build with every constant the decoder knows about.
//! - [`HeapBuilder`] lays out heap objects in a [`MockMemory`] following the
//!   standard table.
//! - [`MockThreads`] hands out fixed threads and native frames.

use std::cell::Cell;
use std::collections::HashMap;

use crate::error::{HindsightError, HindsightResult};
use crate::layout::{ConstantSource, Layout, SYMBOL_PREFIX};
use crate::memory::{decode_unsigned, MemoryAccess};
use crate::target::ThreadSource;
use crate::types::{Address, NativeFrame, ThreadInfo};
use crate::value::Smi;

/// Sparse byte-addressed memory.
#[derive(Debug, Default)]
pub struct MockMemory
{
    bytes: HashMap<u64, u8>,
    poisoned: Vec<(u64, u64)>,
    byte_reads: Cell<usize>,
    generation: Cell<u64>,
}

impl MockMemory
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Store `data` at `address`.
    pub fn write(&mut self, address: Address, data: &[u8])
    {
        for (i, byte) in data.iter().enumerate() {
            self.bytes.insert(address.value().wrapping_add(i as u64), *byte);
        }
    }

    /// Store a little-endian word at `address`.
    pub fn write_u64(&mut self, address: Address, value: u64)
    {
        self.write(address, &value.to_le_bytes());
    }

    /// Make every read overlapping `[address, address + len)` fail.
    pub fn poison(&mut self, address: Address, len: usize)
    {
        self.poisoned.push((address.value(), address.value().saturating_add(len as u64)));
    }

    /// Number of `read_bytes` calls so far.
    #[must_use]
    pub fn byte_reads(&self) -> usize
    {
        self.byte_reads.get()
    }

    /// Simulate the target resuming: bumps the generation.
    pub fn advance_generation(&self)
    {
        self.generation.set(self.generation.get() + 1);
    }

    fn fetch(&self, address: Address, len: usize) -> HindsightResult<Vec<u8>>
    {
        let start = address.value();
        let end = start.saturating_add(len as u64);
        if self.poisoned.iter().any(|&(lo, hi)| start < hi && lo < end) {
            return Err(HindsightError::read(address, len));
        }
        (0..len as u64)
            .map(|i| self.bytes.get(&start.wrapping_add(i)).copied())
            .collect::<Option<Vec<u8>>>()
            .ok_or(HindsightError::read(address, len))
    }
}

impl MemoryAccess for MockMemory
{
    fn read_bytes(&self, address: Address, len: usize) -> HindsightResult<Vec<u8>>
    {
        self.byte_reads.set(self.byte_reads.get() + 1);
        self.fetch(address, len)
    }

    fn read_unsigned(&self, address: Address, width: usize) -> HindsightResult<u64>
    {
        let bytes = self.fetch(address, width)?;
        decode_unsigned(address, &bytes)
    }

    fn generation(&self) -> u64
    {
        self.generation.get()
    }
}

/// A `v8dbg_` symbol table held in memory.
#[derive(Debug, Clone, Default)]
pub struct MockConstants
{
    id: u64,
    values: HashMap<String, i64>,
}

impl MockConstants
{
    /// An empty table.
    #[must_use]
    pub fn empty(id: u64) -> Self
    {
        Self {
            id,
            values: HashMap::new(),
        }
    }

    /// The full table of a 64-bit build.
    #[must_use]
    pub fn standard() -> Self
    {
        let mut table = Self::empty(1);
        for (name, value) in STANDARD_CONSTANTS {
            table.values.insert(format!("{SYMBOL_PREFIX}{name}"), *value);
        }
        table
    }

    /// Set `name` (without prefix) to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: i64) -> Self
    {
        self.values.insert(format!("{SYMBOL_PREFIX}{name}"), value);
        self
    }

    /// Drop `name` (without prefix) from the table.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self
    {
        self.values.remove(&format!("{SYMBOL_PREFIX}{name}"));
        self
    }

    /// Change the target identity reported to the layout cache.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self
    {
        self.id = id;
        self
    }
}

impl ConstantSource for MockConstants
{
    fn resolve_constant(&self, name: &str) -> Option<i64>
    {
        self.values.get(name).copied()
    }

    fn target_id(&self) -> u64
    {
        self.id
    }
}

/// Layout loaded from [`MockConstants::standard`].
#[must_use]
pub fn standard_layout() -> Layout
{
    Layout::load(&MockConstants::standard())
}

/// Instance type ids used by the standard table.
pub mod types
{
    pub const ONE_BYTE_SEQ: i64 = 0x08;
    pub const TWO_BYTE_SEQ: i64 = 0x00;
    pub const ONE_BYTE_CONS: i64 = 0x09;
    pub const ONE_BYTE_EXTERNAL: i64 = 0x0a;
    pub const ONE_BYTE_SLICED: i64 = 0x0b;
    pub const ONE_BYTE_THIN: i64 = 0x0d;
    pub const SYMBOL: i64 = 128;
    pub const HEAP_NUMBER: i64 = 129;
    pub const ODDBALL: i64 = 131;
    pub const MAP: i64 = 132;
    pub const CODE: i64 = 133;
    pub const FIXED_ARRAY: i64 = 134;
    pub const DESCRIPTOR_ARRAY: i64 = 135;
    pub const NAME_DICTIONARY: i64 = 136;
    pub const SCOPE_INFO: i64 = 137;
    pub const SHARED_FUNCTION_INFO: i64 = 138;
    pub const SCRIPT: i64 = 139;
    pub const FUNCTION_CONTEXT: i64 = 140;
    pub const JS_GLOBAL_PROXY: i64 = 1041;
    pub const JS_GLOBAL_OBJECT: i64 = 1042;
    pub const JS_OBJECT: i64 = 1043;
    pub const JS_API_OBJECT: i64 = 1044;
    pub const JS_ERROR: i64 = 1046;
    pub const JS_ARRAY: i64 = 1047;
    pub const JS_FUNCTION: i64 = 1048;
    pub const JS_ARRAY_BUFFER: i64 = 1049;
    pub const JS_TYPED_ARRAY: i64 = 1050;
    pub const JS_REGEXP: i64 = 1051;
    pub const JS_DATE: i64 = 1052;
    pub const UNKNOWN: i64 = 1100;
}

/// Frame type markers used by the standard table.
pub mod frames
{
    pub const ENTRY: i64 = 1;
    pub const ENTRY_CONSTRUCT: i64 = 2;
    pub const EXIT: i64 = 3;
    pub const OPTIMIZED: i64 = 4;
    pub const JAVASCRIPT: i64 = 5;
    pub const STUB: i64 = 6;
    pub const INTERNAL: i64 = 8;
    pub const CONSTRUCT: i64 = 9;
    pub const ADAPTOR: i64 = 10;
}

/// Oddball kinds used by the standard table.
pub mod oddballs
{
    pub const FALSE: i64 = 0;
    pub const TRUE: i64 = 1;
    pub const THE_HOLE: i64 = 2;
    pub const NULL: i64 = 3;
    pub const UNDEFINED: i64 = 5;
    pub const UNINITIALIZED: i64 = 6;
    pub const EXCEPTION: i64 = 8;
}

/// Property details encoding of the standard table (location flavour).
pub mod details
{
    pub const LOCATION_SHIFT: i64 = 1;
    pub const REPRESENTATION_SHIFT: i64 = 6;
    pub const REPRESENTATION_DOUBLE: i64 = 2;
    pub const INDEX_SHIFT: i64 = 10;

    /// Details for a tagged field stored at `index`.
    #[must_use]
    pub const fn field(index: i64) -> i64
    {
        index << INDEX_SHIFT
    }

    /// Details for a double field stored at `index`.
    #[must_use]
    pub const fn double_field(index: i64) -> i64
    {
        (index << INDEX_SHIFT) | (REPRESENTATION_DOUBLE << REPRESENTATION_SHIFT)
    }

    /// Details for a value kept in the descriptor itself (accessor, constant).
    #[must_use]
    pub const fn descriptor() -> i64
    {
        1 << LOCATION_SHIFT
    }
}

const STANDARD_CONSTANTS: &[(&str, i64)] = &[
    ("PointerSizeLog2", 3),
    ("SmiTag", 0),
    ("SmiTagMask", 1),
    ("SmiShiftSize", 31),
    ("HeapObjectTag", 1),
    ("HeapObjectTagMask", 3),
    ("class_HeapObject__map__Map", 0),
    // Map
    ("class_Map__instance_size_in_words__char", 8),
    ("class_Map__inobject_properties_start_or_constructor_function_index__char", 9),
    ("class_Map__instance_type__uint16_t", 12),
    ("class_Map__bit_field3__int", 16),
    ("class_Map__constructor_or_backpointer__Object", 24),
    ("class_Map__instance_descriptors__DescriptorArray", 32),
    ("bit_field3_dictionary_map_shift", 21),
    ("bit_field3_number_of_own_descriptors_shift", 10),
    ("bit_field3_number_of_own_descriptors_mask", 0x3ff << 10),
    // JSObject and friends
    ("class_JSReceiver__raw_properties_or_hash__Object", 8),
    ("class_JSObject__elements__Object", 16),
    ("class_HeapNumber__value__double", 8),
    ("class_JSArray__length__Object", 24),
    ("class_JSFunction__shared__SharedFunctionInfo", 24),
    ("class_JSFunction__context__Context", 32),
    ("class_JSRegExp__source__Object", 32),
    ("class_JSDate__value__Object", 24),
    // SharedFunctionInfo and Script
    ("class_SharedFunctionInfo__raw_name__Object", 8),
    ("class_SharedFunctionInfo__scope_info__ScopeInfo", 16),
    ("class_SharedFunctionInfo__inferred_name__String", 24),
    ("class_SharedFunctionInfo__script__Object", 32),
    ("class_SharedFunctionInfo__start_position_and_type__int", 40),
    ("class_SharedFunctionInfo__end_position__int", 44),
    ("class_SharedFunctionInfo__internal_formal_parameter_count__uint16_t", 48),
    ("sharedfunctioninfo_start_position_shift", 2),
    ("class_Script__name__Object", 8),
    ("class_Script__line_offset__SMI", 16),
    ("class_Script__source__Object", 24),
    ("class_Script__line_ends__Object", 32),
    // Strings
    ("StringEncodingMask", 0x8),
    ("StringRepresentationMask", 0x7),
    ("OneByteStringTag", 0x8),
    ("TwoByteStringTag", 0x0),
    ("SeqStringTag", 0x0),
    ("ConsStringTag", 0x1),
    ("ExternalStringTag", 0x2),
    ("SlicedStringTag", 0x3),
    ("ThinStringTag", 0x5),
    ("class_String__length__int32_t", 12),
    ("class_SeqOneByteString__chars__char", 16),
    ("class_SeqTwoByteString__chars__char", 16),
    ("class_ConsString__first__String", 16),
    ("class_ConsString__second__String", 24),
    ("class_SlicedString__parent__String", 16),
    ("class_SlicedString__offset__SMI", 24),
    ("class_ThinString__actual__String", 16),
    // FixedArray
    ("class_FixedArrayBase__length__SMI", 8),
    ("class_FixedTypedArrayBase__base_pointer__Object", 16),
    ("class_FixedTypedArrayBase__external_pointer__uintptr_t", 24),
    // Oddball
    ("class_Oddball__kind__SMI", 32),
    ("OddballFalse", oddballs::FALSE),
    ("OddballTrue", oddballs::TRUE),
    ("OddballTheHole", oddballs::THE_HOLE),
    ("OddballNull", oddballs::NULL),
    ("OddballUndefined", oddballs::UNDEFINED),
    ("OddballUninitialized", oddballs::UNINITIALIZED),
    ("OddballException", oddballs::EXCEPTION),
    // Buffers
    ("class_JSArrayBuffer__backing_store__uintptr_t", 32),
    ("class_JSArrayBuffer__byte_length__size_t", 40),
    ("class_JSArrayBuffer__bit_field__uint32_t", 48),
    ("jsarray_buffer_was_neutered_mask", 0x8),
    ("jsarray_buffer_was_neutered_shift", 3),
    ("class_JSArrayBufferView__buffer__Object", 24),
    ("class_JSArrayBufferView__byte_offset__size_t", 32),
    ("class_JSArrayBufferView__byte_length__size_t", 40),
    // Symbol
    ("class_Symbol__name__Object", 16),
    // Descriptors
    ("prop_idx_first", 2),
    ("prop_desc_size", 3),
    ("prop_desc_key", 0),
    ("prop_desc_value", 1),
    ("prop_desc_details", 2),
    ("prop_index_mask", 0x3ff << details::INDEX_SHIFT),
    ("prop_index_shift", details::INDEX_SHIFT),
    ("prop_representation_mask", 0x7 << details::REPRESENTATION_SHIFT),
    ("prop_representation_shift", details::REPRESENTATION_SHIFT),
    ("prop_representation_double", details::REPRESENTATION_DOUBLE),
    ("prop_location_mask", 1 << details::LOCATION_SHIFT),
    ("prop_location_shift", details::LOCATION_SHIFT),
    ("prop_location_Field", 0),
    ("prop_location_Descriptor", 1),
    // NameDictionary
    ("class_NameDictionaryShape__entry_size__int", 3),
    ("class_NameDictionaryShape__prefix_start_index__int", 3),
    ("class_NameDictionaryShape__prefix_size__int", 2),
    // Context and ScopeInfo
    ("class_Context__closure_index__int", 0),
    ("class_Context__previous_index__int", 1),
    ("context_idx_scope_info", 2),
    ("class_Context__min_context_slots__int", 4),
    ("scopeinfo_idx_nparams", 1),
    ("scopeinfo_idx_nstacklocals", 2),
    ("scopeinfo_idx_ncontextlocals", 3),
    ("scopeinfo_idx_first_vars", 4),
    // Frames
    ("off_fp_context", -8),
    ("off_fp_marker", -8),
    ("off_fp_function", -16),
    ("off_fp_args", 16),
    ("frametype_EntryFrame", frames::ENTRY),
    ("frametype_ConstructEntryFrame", frames::ENTRY_CONSTRUCT),
    ("frametype_ExitFrame", frames::EXIT),
    ("frametype_OptimizedFrame", frames::OPTIMIZED),
    ("frametype_JavaScriptFrame", frames::JAVASCRIPT),
    ("frametype_StubFrame", frames::STUB),
    ("frametype_InternalFrame", frames::INTERNAL),
    ("frametype_ConstructFrame", frames::CONSTRUCT),
    ("frametype_ArgumentsAdaptorFrame", frames::ADAPTOR),
    // Instance types
    ("FirstNonstringType", types::SYMBOL),
    ("FirstJSObjectType", 1040),
    ("FirstContextType", types::FUNCTION_CONTEXT),
    ("LastContextType", 145),
    ("type_Symbol__SYMBOL_TYPE", types::SYMBOL),
    ("type_HeapNumber__HEAP_NUMBER_TYPE", types::HEAP_NUMBER),
    ("type_Oddball__ODDBALL_TYPE", types::ODDBALL),
    ("type_Map__MAP_TYPE", types::MAP),
    ("type_Code__CODE_TYPE", types::CODE),
    ("type_FixedArray__FIXED_ARRAY_TYPE", types::FIXED_ARRAY),
    ("type_DescriptorArray__DESCRIPTOR_ARRAY_TYPE", types::DESCRIPTOR_ARRAY),
    ("type_NameDictionary__NAME_DICTIONARY_TYPE", types::NAME_DICTIONARY),
    ("type_ScopeInfo__SCOPE_INFO_TYPE", types::SCOPE_INFO),
    ("type_SharedFunctionInfo__SHARED_FUNCTION_INFO_TYPE", types::SHARED_FUNCTION_INFO),
    ("type_Script__SCRIPT_TYPE", types::SCRIPT),
    ("type_JSGlobalProxy__JS_GLOBAL_PROXY_TYPE", types::JS_GLOBAL_PROXY),
    ("type_JSGlobalObject__JS_GLOBAL_OBJECT_TYPE", types::JS_GLOBAL_OBJECT),
    ("type_JSObject__JS_OBJECT_TYPE", types::JS_OBJECT),
    ("type_JSAPIObject__JS_API_OBJECT_TYPE", types::JS_API_OBJECT),
    ("type_JSError__JS_ERROR_TYPE", types::JS_ERROR),
    ("type_JSArray__JS_ARRAY_TYPE", types::JS_ARRAY),
    ("type_JSFunction__JS_FUNCTION_TYPE", types::JS_FUNCTION),
    ("type_JSArrayBuffer__JS_ARRAY_BUFFER_TYPE", types::JS_ARRAY_BUFFER),
    ("type_JSTypedArray__JS_TYPED_ARRAY_TYPE", types::JS_TYPED_ARRAY),
    ("type_JSRegExp__JS_REGEXP_TYPE", types::JS_REGEXP),
    ("type_JSDate__JS_DATE_TYPE", types::JS_DATE),
];

/// Fixed threads and frames.
#[derive(Debug, Clone, Default)]
pub struct MockThreads
{
    threads: Vec<(ThreadInfo, Vec<NativeFrame>)>,
}

impl MockThreads
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a thread with its frames, innermost first.
    #[must_use]
    pub fn with_thread(mut self, info: ThreadInfo, frames: Vec<NativeFrame>) -> Self
    {
        self.threads.push((info, frames));
        self
    }
}

impl ThreadSource for MockThreads
{
    fn threads(&self) -> HindsightResult<Vec<ThreadInfo>>
    {
        Ok(self.threads.iter().map(|(info, _)| info.clone()).collect())
    }

    fn native_frames(&self, thread: usize) -> HindsightResult<Vec<NativeFrame>>
    {
        self.threads
            .get(thread)
            .map(|(_, frames)| frames.clone())
            .ok_or_else(|| HindsightError::InvalidArgument(format!("no thread at index {thread}")))
    }
}

/// Tagged heap pointers are the untagged start plus one.
const TAG: u64 = 1;
const HEAP_BASE: u64 = 0x10_0000;

/// Lays out heap objects in a [`MockMemory`] using the standard table.
///
/// Every method returns the *tagged* pointer of what it built, ready to be
/// stored in another object's slot or passed to the inspector.
pub struct HeapBuilder
{
    memory: MockMemory,
    layout: Layout,
    next: u64,
    maps: HashMap<i64, Address>,
}

impl Default for HeapBuilder
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl HeapBuilder
{
    #[must_use]
    pub fn new() -> Self
    {
        Self {
            memory: MockMemory::new(),
            layout: standard_layout(),
            next: HEAP_BASE,
            maps: HashMap::new(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout
    {
        &self.layout
    }

    #[must_use]
    pub fn memory(&self) -> &MockMemory
    {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MockMemory
    {
        &mut self.memory
    }

    /// Hand the memory over.
    #[must_use]
    pub fn finish(self) -> MockMemory
    {
        self.memory
    }

    /// Encode a Smi word.
    #[must_use]
    pub fn smi(&self, value: i64) -> u64
    {
        Smi::encode(value, &self.layout)
    }

    /// Reserve `size` bytes and return the tagged pointer.
    pub fn alloc(&mut self, size: usize) -> Address
    {
        let start = self.next;
        self.next += (size as u64).max(8).next_multiple_of(16) + 16;
        Address::new(start | TAG)
    }

    /// Write a word at `offset` from the untagged start of `object`.
    pub fn set_word(&mut self, object: Address, offset: i64, value: u64)
    {
        self.memory.write_u64(Self::at(object, offset), value);
    }

    /// Write raw bytes at `offset` from the untagged start of `object`.
    pub fn set_bytes(&mut self, object: Address, offset: i64, data: &[u8])
    {
        self.memory.write(Self::at(object, offset), data);
    }

    /// Point `object`'s map slot at `map`.
    pub fn set_map(&mut self, object: Address, map: Address)
    {
        self.set_word(object, 0, map.value());
    }

    fn at(object: Address, offset: i64) -> Address
    {
        object.offset(offset - TAG as i64)
    }

    fn meta_map(&mut self) -> Address
    {
        if let Some(&map) = self.maps.get(&types::MAP) {
            return map;
        }
        let map = self.alloc(48);
        self.maps.insert(types::MAP, map);
        self.write_map(map, map, types::MAP, 0, 0, None, 0);
        map
    }

    #[allow(clippy::too_many_arguments)]
    fn write_map(
        &mut self,
        map: Address,
        meta: Address,
        type_id: i64,
        instance_words: u8,
        in_object: u8,
        descriptors: Option<(Address, usize)>,
        constructor: u64,
    )
    {
        self.set_map(map, meta);
        self.set_bytes(map, 8, &[instance_words, instance_words - in_object.min(instance_words)]);
        self.set_bytes(map, 12, &(type_id as u16).to_le_bytes());
        let own = descriptors.map_or(0, |(_, count)| count as u32);
        self.set_bytes(map, 16, &(own << 10).to_le_bytes());
        self.set_word(map, 24, constructor);
        let empty = self.smi(0);
        self.set_word(map, 32, descriptors.map_or(empty, |(array, _)| array.value()));
    }

    /// A map with no properties for `type_id` (shared per type).
    pub fn map(&mut self, type_id: i64) -> Address
    {
        if let Some(&map) = self.maps.get(&type_id) {
            return map;
        }
        let meta = self.meta_map();
        let map = self.alloc(48);
        self.write_map(map, meta, type_id, 4, 0, None, 0);
        self.maps.insert(type_id, map);
        map
    }

    /// A fresh map for an object with `in_object` in-object slots.
    pub fn object_map(
        &mut self,
        type_id: i64,
        in_object: u8,
        descriptors: Option<(Address, usize)>,
        constructor: Option<Address>,
    ) -> Address
    {
        let meta = self.meta_map();
        let map = self.alloc(48);
        let words = 3 + in_object;
        let constructor = constructor.map_or_else(|| self.smi(0), Address::value);
        self.write_map(map, meta, type_id, words, in_object, descriptors, constructor);
        map
    }

    /// Mark `map` as describing a dictionary-mode object.
    pub fn set_dictionary_map(&mut self, map: Address)
    {
        self.set_bytes(map, 16, &(1u32 << 21).to_le_bytes());
    }

    /// A sequential one-byte string.
    pub fn one_byte_string(&mut self, text: &str) -> Address
    {
        let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
        let map = self.map(types::ONE_BYTE_SEQ);
        let string = self.alloc(16 + bytes.len());
        self.set_map(string, map);
        self.set_bytes(string, 12, &(bytes.len() as u32).to_le_bytes());
        self.set_bytes(string, 16, &bytes);
        string
    }

    /// A sequential two-byte string.
    pub fn two_byte_string(&mut self, text: &str) -> Address
    {
        let units: Vec<u16> = text.encode_utf16().collect();
        let map = self.map(types::TWO_BYTE_SEQ);
        let string = self.alloc(16 + units.len() * 2);
        self.set_map(string, map);
        self.set_bytes(string, 12, &(units.len() as u32).to_le_bytes());
        let bytes: Vec<u8> = units.iter().flat_map(|unit| unit.to_le_bytes()).collect();
        self.set_bytes(string, 16, &bytes);
        string
    }

    /// A cons string of two one-byte halves.
    pub fn cons_string(&mut self, first: Address, second: Address, length: usize) -> Address
    {
        let map = self.map(types::ONE_BYTE_CONS);
        let string = self.alloc(32);
        self.set_map(string, map);
        self.set_bytes(string, 12, &(length as u32).to_le_bytes());
        self.set_word(string, 16, first.value());
        self.set_word(string, 24, second.value());
        string
    }

    /// A sliced string of `length` characters starting at `offset` in `parent`.
    pub fn sliced_string(&mut self, parent: Address, offset: usize, length: usize) -> Address
    {
        let map = self.map(types::ONE_BYTE_SLICED);
        let string = self.alloc(32);
        self.set_map(string, map);
        self.set_bytes(string, 12, &(length as u32).to_le_bytes());
        self.set_word(string, 16, parent.value());
        let offset = self.smi(offset as i64);
        self.set_word(string, 24, offset);
        string
    }

    /// An oddball of `kind`, shared per kind.
    pub fn oddball(&mut self, kind: i64) -> Address
    {
        let key = -1 - kind;
        if let Some(&oddball) = self.maps.get(&key) {
            return oddball;
        }
        let map = self.map(types::ODDBALL);
        let oddball = self.alloc(40);
        self.set_map(oddball, map);
        let kind_word = self.smi(kind);
        self.set_word(oddball, 32, kind_word);
        self.maps.insert(key, oddball);
        oddball
    }

    pub fn undefined(&mut self) -> Address
    {
        self.oddball(oddballs::UNDEFINED)
    }

    pub fn the_hole(&mut self) -> Address
    {
        self.oddball(oddballs::THE_HOLE)
    }

    /// A heap number.
    pub fn heap_number(&mut self, value: f64) -> Address
    {
        let map = self.map(types::HEAP_NUMBER);
        let number = self.alloc(16);
        self.set_map(number, map);
        self.set_word(number, 8, value.to_bits());
        number
    }

    /// A FixedArray-shaped object of `type_id` holding `slots`.
    pub fn array_of_type(&mut self, type_id: i64, slots: &[u64]) -> Address
    {
        let map = self.map(type_id);
        let array = self.alloc(16 + slots.len() * 8);
        self.set_map(array, map);
        let length = self.smi(slots.len() as i64);
        self.set_word(array, 8, length);
        for (i, slot) in slots.iter().enumerate() {
            self.set_word(array, 16 + i as i64 * 8, *slot);
        }
        array
    }

    /// A FixedArray holding `slots`.
    pub fn fixed_array(&mut self, slots: &[u64]) -> Address
    {
        self.array_of_type(types::FIXED_ARRAY, slots)
    }

    /// A descriptor array; each entry is `(key, details, value)`.
    pub fn descriptors(&mut self, entries: &[(Address, i64, u64)]) -> Address
    {
        let mut slots = vec![self.smi(entries.len() as i64), self.smi(0)];
        for &(key, details, value) in entries {
            slots.push(key.value());
            slots.push(value);
            slots.push(self.smi(details));
        }
        self.array_of_type(types::DESCRIPTOR_ARRAY, &slots)
    }

    /// A plain object whose properties live in-object, described by descriptors.
    pub fn object(&mut self, properties: &[(&str, u64)]) -> Address
    {
        self.object_of_type(types::JS_OBJECT, properties, None)
    }

    /// An object of `type_id` with in-object `properties` and an optional constructor.
    pub fn object_of_type(&mut self, type_id: i64, properties: &[(&str, u64)], constructor: Option<Address>) -> Address
    {
        let entries: Vec<(Address, i64, u64)> = properties
            .iter()
            .enumerate()
            .map(|(i, (key, _))| {
                let key = self.one_byte_string(key);
                (key, details::field(i as i64), self.smi(0))
            })
            .collect();
        let descriptors = self.descriptors(&entries);
        let in_object = properties.len() as u8;
        let map = self.object_map(type_id, in_object, Some((descriptors, properties.len())), constructor);
        let object = self.alloc(24 + properties.len() * 8);
        self.init_object(object, map);
        for (i, (_, value)) in properties.iter().enumerate() {
            self.set_word(object, 24 + i as i64 * 8, *value);
        }
        object
    }

    /// Write the JSObject header of `object` with empty properties and elements.
    pub fn init_object(&mut self, object: Address, map: Address)
    {
        let empty = self.fixed_array(&[]);
        self.set_map(object, map);
        self.set_word(object, 8, empty.value());
        self.set_word(object, 16, empty.value());
    }

    /// A JSArray whose elements are `elements`.
    pub fn js_array(&mut self, elements: &[u64]) -> Address
    {
        let backing = self.fixed_array(elements);
        let map = self.map(types::JS_ARRAY);
        let array = self.alloc(32);
        self.init_object(array, map);
        self.set_word(array, 16, backing.value());
        let length = self.smi(elements.len() as i64);
        self.set_word(array, 24, length);
        array
    }

    /// A script with `name` and `source`.
    pub fn script(&mut self, name: &str, source: &str, line_offset: i64) -> Address
    {
        let name = self.one_byte_string(name);
        let source = self.one_byte_string(source);
        let map = self.map(types::SCRIPT);
        let script = self.alloc(40);
        self.set_map(script, map);
        self.set_word(script, 8, name.value());
        let offset = self.smi(line_offset);
        self.set_word(script, 16, offset);
        self.set_word(script, 24, source.value());
        let undefined = self.undefined();
        self.set_word(script, 32, undefined.value());
        script
    }

    /// A SharedFunctionInfo spanning `[start, end)` of `script`.
    pub fn shared_info(&mut self, name: &str, script: Option<Address>, start: i64, end: i64) -> Address
    {
        let name = self.one_byte_string(name);
        let map = self.map(types::SHARED_FUNCTION_INFO);
        let info = self.alloc(56);
        self.set_map(info, map);
        self.set_word(info, 8, name.value());
        let empty = self.smi(0);
        self.set_word(info, 16, empty);
        let inferred = self.one_byte_string("");
        self.set_word(info, 24, inferred.value());
        let script = script.unwrap_or_else(|| self.undefined());
        self.set_word(info, 32, script.value());
        self.set_bytes(info, 40, &((start << 2) as i32).to_le_bytes());
        self.set_bytes(info, 44, &(end as i32).to_le_bytes());
        self.set_bytes(info, 48, &0u16.to_le_bytes());
        info
    }

    /// A JSFunction over `shared` with `context`.
    pub fn function(&mut self, shared: Address, context: Option<Address>) -> Address
    {
        let map = self.map(types::JS_FUNCTION);
        let function = self.alloc(40);
        self.init_object(function, map);
        self.set_word(function, 24, shared.value());
        let context = context.map_or_else(|| self.smi(0), Address::value);
        self.set_word(function, 32, context);
        function
    }

    /// A scope info with `parameters` unnamed parameters, the given context
    /// local names and an optional function name.
    pub fn scope_info(&mut self, parameters: i64, locals: &[&str], function_name: Option<&str>) -> Address
    {
        let mut slots = vec![
            self.smi(0),
            self.smi(parameters),
            self.smi(0),
            self.smi(locals.len() as i64),
        ];
        for index in 0..parameters {
            let name = self.one_byte_string(&format!("p{index}"));
            slots.push(name.value());
        }
        for local in locals {
            let name = self.one_byte_string(local);
            slots.push(name.value());
        }
        slots.extend(locals.iter().map(|_| self.smi(0)));
        let name = match function_name {
            Some(name) => self.one_byte_string(name).value(),
            None => self.smi(0),
        };
        slots.push(name);
        self.array_of_type(types::SCOPE_INFO, &slots)
    }

    /// Raw (untagged) bytes outside any object; returns their address.
    pub fn raw_bytes(&mut self, data: &[u8]) -> Address
    {
        let address = Address::new(self.alloc(data.len()).value() & !TAG);
        self.memory.write(address, data);
        address
    }

    /// An array buffer whose payload is `data`.
    pub fn array_buffer(&mut self, data: &[u8], neutered: bool) -> Address
    {
        let map = self.map(types::JS_ARRAY_BUFFER);
        let buffer = self.alloc(56);
        self.init_object(buffer, map);
        let store = self.raw_bytes(data);
        self.set_word(buffer, 32, store.value());
        self.set_word(buffer, 40, data.len() as u64);
        let bits: u32 = if neutered { 0x8 } else { 0 };
        self.set_bytes(buffer, 48, &bits.to_le_bytes());
        buffer
    }

    /// A typed array over `buffer`. With `on_heap`, the elements object
    /// points at that payload through its external pointer.
    pub fn typed_array(&mut self, buffer: Address, offset: usize, length: usize, on_heap: Option<Address>) -> Address
    {
        let map = self.map(types::JS_TYPED_ARRAY);
        let view = self.alloc(48);
        self.init_object(view, map);
        self.set_word(view, 24, buffer.value());
        self.set_word(view, 32, offset as u64);
        self.set_word(view, 40, length as u64);
        if let Some(data) = on_heap {
            let elements_map = self.map(types::FIXED_ARRAY);
            let elements = self.alloc(32);
            self.set_map(elements, elements_map);
            let zero = self.smi(0);
            self.set_word(elements, 8, zero);
            self.set_word(elements, 16, 0);
            self.set_word(elements, 24, data.value());
            self.set_word(view, 16, elements.value());
        }
        view
    }

    /// A date whose time value is a heap number.
    pub fn date(&mut self, time: f64) -> Address
    {
        let map = self.map(types::JS_DATE);
        let date = self.alloc(32);
        self.init_object(date, map);
        let value = self.heap_number(time);
        self.set_word(date, 24, value.value());
        date
    }

    /// A symbol with an optional description.
    pub fn symbol(&mut self, description: Option<&str>) -> Address
    {
        let map = self.map(types::SYMBOL);
        let symbol = self.alloc(24);
        self.set_map(symbol, map);
        let name = match description {
            Some(text) => self.one_byte_string(text),
            None => self.undefined(),
        };
        self.set_word(symbol, 16, name.value());
        symbol
    }

    /// A function context holding `locals` after the fixed header slots.
    pub fn context(
        &mut self,
        closure: Option<Address>,
        previous: Option<Address>,
        scope_info: Address,
        locals: &[u64],
    ) -> Address
    {
        let mut slots = vec![
            closure.map_or_else(|| self.smi(0), Address::value),
            previous.map_or_else(|| self.smi(0), Address::value),
            scope_info.value(),
            self.smi(0),
        ];
        slots.extend_from_slice(locals);
        self.array_of_type(types::FUNCTION_CONTEXT, &slots)
    }
}
