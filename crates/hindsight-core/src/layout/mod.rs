//! # Layout Constants
//!
//! Every offset, tag and type id the decoder needs, resolved once per target
//! from the `v8dbg_*` postmortem symbols node exports.
//!
//! ## Missing constants
//!
//! Builds intentionally omit constants they have no use for, so a failed
//! lookup is recorded on the individual [`Constant`] instead of failing the
//! load. Consumers call [`Constant::get`], which turns an absent value into
//! [`HindsightError::LayoutUnavailable`] naming the symbol, or check
//! [`Constant::is_available`] first when a degraded path exists.
//!
//! ## Alternatives
//!
//! A field that was renamed between V8 versions is looked up under each of
//! its historical names in order; the first hit wins. Where the name also
//! encodes how the field is stored (`__SMI`, `__int`, `__size_t`), the hit
//! decides the field's [`Repr`].

mod kinds;

use std::sync::Arc;

use tracing::debug;

pub use kinds::*;

use crate::error::{HindsightError, HindsightResult};

/// Prefix shared by every postmortem symbol.
pub const SYMBOL_PREFIX: &str = "v8dbg_";

/// Source of named integer constants (the executable's symbol table).
pub trait ConstantSource
{
    /// Resolve a fully prefixed constant name (e.g. `v8dbg_SmiTag`).
    fn resolve_constant(&self, name: &str) -> Option<i64>;

    /// Identity of the target the constants come from.
    ///
    /// [`LayoutCache::load`] re-resolves only when this changes.
    fn target_id(&self) -> u64;
}

/// A named layout constant that may be unavailable in this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constant
{
    name: &'static str,
    value: Option<i64>,
}

impl Constant
{
    /// A constant with a known value.
    #[must_use]
    pub const fn known(name: &'static str, value: i64) -> Self
    {
        Self {
            name,
            value: Some(value),
        }
    }

    /// A constant this build does not provide.
    #[must_use]
    pub const fn missing(name: &'static str) -> Self
    {
        Self { name, value: None }
    }

    /// Symbolic name (without the `v8dbg_` prefix).
    #[must_use]
    pub const fn name(self) -> &'static str
    {
        self.name
    }

    /// The value, if resolved.
    #[must_use]
    pub const fn value(self) -> Option<i64>
    {
        self.value
    }

    /// The value, or `-1` when unavailable (the convention of the symbol table).
    #[must_use]
    pub fn raw(self) -> i64
    {
        self.value.unwrap_or(-1)
    }

    /// Whether this build resolved the constant.
    #[must_use]
    pub const fn is_available(self) -> bool
    {
        self.value.is_some()
    }

    /// The value, or a `LayoutUnavailable` error naming the constant.
    pub fn get(self) -> HindsightResult<i64>
    {
        self.value.ok_or(HindsightError::LayoutUnavailable(self.name))
    }

    /// `true` when resolved and equal to `other`.
    #[must_use]
    pub fn matches(self, other: i64) -> bool
    {
        self.value == Some(other)
    }
}

/// How a field's bits are stored in the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr
{
    /// A tagged value (Smi or heap pointer).
    Tagged,
    /// A tagged small integer.
    Smi,
    /// A raw 32-bit integer.
    Int32,
    /// A raw 16-bit integer.
    Uint16,
    /// A raw byte.
    Uint8,
    /// A raw pointer-sized integer.
    Word,
}

impl Repr
{
    /// Width in bytes of a raw representation; tagged ones use the pointer size.
    #[must_use]
    pub const fn width(self, pointer_size: usize) -> usize
    {
        match self {
            Repr::Tagged | Repr::Smi | Repr::Word => pointer_size,
            Repr::Int32 => 4,
            Repr::Uint16 => 2,
            Repr::Uint8 => 1,
        }
    }
}

/// A field offset together with its storage representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field
{
    /// Byte offset from the object's untagged start.
    pub offset: Constant,
    /// How the stored bits are interpreted.
    pub repr: Repr,
}

impl Field
{
    /// A field with a known offset.
    #[must_use]
    pub const fn known(name: &'static str, offset: i64, repr: Repr) -> Self
    {
        Self {
            offset: Constant::known(name, offset),
            repr,
        }
    }

    /// Whether this build resolved the field's offset.
    #[must_use]
    pub const fn is_available(self) -> bool
    {
        self.offset.is_available()
    }
}

/// Resolves constants against a [`ConstantSource`], recording what is missing.
pub(crate) struct Loader<'a>
{
    source: &'a dyn ConstantSource,
    resolved: usize,
    missing: Vec<&'static str>,
}

impl<'a> Loader<'a>
{
    fn new(source: &'a dyn ConstantSource) -> Self
    {
        Self {
            source,
            resolved: 0,
            missing: Vec::new(),
        }
    }

    fn lookup(&mut self, name: &str) -> Option<i64>
    {
        self.source.resolve_constant(&format!("{SYMBOL_PREFIX}{name}"))
    }

    /// First of `names` that resolves; the constant is named after `names[0]`.
    pub(crate) fn constant(&mut self, names: &[&'static str]) -> Constant
    {
        let canonical = names.first().copied().unwrap_or("<unnamed>");
        for name in names {
            if let Some(value) = self.lookup(name) {
                self.resolved += 1;
                return Constant::known(canonical, value);
            }
        }
        self.missing.push(canonical);
        Constant::missing(canonical)
    }

    /// A constant that falls back to `default` when absent; not counted as missing.
    pub(crate) fn constant_or(&mut self, names: &[&'static str], default: i64) -> Constant
    {
        let canonical = names.first().copied().unwrap_or("<unnamed>");
        for name in names {
            if let Some(value) = self.lookup(name) {
                self.resolved += 1;
                return Constant::known(canonical, value);
            }
        }
        Constant::known(canonical, default)
    }

    /// First of `candidates` that resolves, carrying that candidate's representation.
    pub(crate) fn field(&mut self, candidates: &[(&'static str, Repr)]) -> Field
    {
        let (canonical, fallback_repr) = candidates.first().copied().unwrap_or(("<unnamed>", Repr::Tagged));
        for (name, repr) in candidates {
            if let Some(value) = self.lookup(name) {
                self.resolved += 1;
                return Field {
                    offset: Constant::known(canonical, value),
                    repr: *repr,
                };
            }
        }
        self.missing.push(canonical);
        Field {
            offset: Constant::missing(canonical),
            repr: fallback_repr,
        }
    }

    /// Tagged-field shorthand.
    pub(crate) fn tagged(&mut self, names: &[&'static str]) -> Constant
    {
        self.constant(names)
    }
}

/// The complete constant table for one runtime build.
#[derive(Debug, Clone)]
pub struct Layout
{
    pub common: CommonLayout,
    pub smi: SmiLayout,
    pub heap_object: HeapObjectLayout,
    pub map: MapLayout,
    pub js_object: JsObjectLayout,
    pub heap_number: HeapNumberLayout,
    pub js_array: JsArrayLayout,
    pub js_function: JsFunctionLayout,
    pub shared_info: SharedInfoLayout,
    pub script: ScriptLayout,
    pub string: StringLayout,
    pub fixed_array: FixedArrayLayout,
    pub fixed_typed_array: FixedTypedArrayLayout,
    pub oddball: OddballLayout,
    pub array_buffer: ArrayBufferLayout,
    pub array_buffer_view: ArrayBufferViewLayout,
    pub regexp: RegExpLayout,
    pub date: DateLayout,
    pub symbol: SymbolLayout,
    pub descriptor_array: DescriptorArrayLayout,
    pub name_dictionary: NameDictionaryLayout,
    pub context: ContextLayout,
    pub scope_info: ScopeInfoLayout,
    pub frame: FrameLayout,
    pub types: TypeLayout,
    missing: Vec<&'static str>,
}

impl Layout
{
    /// Resolve every constant from `source`.
    ///
    /// Never fails: unresolved constants are recorded and reported through
    /// [`Layout::missing`].
    pub fn load(source: &dyn ConstantSource) -> Self
    {
        let mut loader = Loader::new(source);
        let common = CommonLayout::load(&mut loader);
        let fixed_array = FixedArrayLayout::load(&mut loader, &common);
        let js_object = JsObjectLayout::load(&mut loader, &common);

        let layout = Self {
            smi: SmiLayout::load(&mut loader),
            heap_object: HeapObjectLayout::load(&mut loader),
            map: MapLayout::load(&mut loader),
            heap_number: HeapNumberLayout::load(&mut loader),
            js_array: JsArrayLayout::load(&mut loader),
            js_function: JsFunctionLayout::load(&mut loader),
            shared_info: SharedInfoLayout::load(&mut loader),
            script: ScriptLayout::load(&mut loader),
            string: StringLayout::load(&mut loader),
            fixed_typed_array: FixedTypedArrayLayout::load(&mut loader),
            oddball: OddballLayout::load(&mut loader),
            array_buffer: ArrayBufferLayout::load(&mut loader),
            array_buffer_view: ArrayBufferViewLayout::load(&mut loader),
            regexp: RegExpLayout::load(&mut loader),
            date: DateLayout::load(&mut loader),
            symbol: SymbolLayout::load(&mut loader),
            descriptor_array: DescriptorArrayLayout::load(&mut loader),
            name_dictionary: NameDictionaryLayout::load(&mut loader),
            context: ContextLayout::load(&mut loader),
            scope_info: ScopeInfoLayout::load(&mut loader),
            frame: FrameLayout::load(&mut loader),
            types: TypeLayout::load(&mut loader),
            common,
            fixed_array,
            js_object,
            missing: std::mem::take(&mut loader.missing),
        };

        debug!(
            resolved = loader.resolved,
            missing = layout.missing.len(),
            "loaded layout constants"
        );
        layout
    }

    /// Size of a tagged slot in bytes.
    #[must_use]
    pub fn pointer_size(&self) -> usize
    {
        self.common.pointer_size
    }

    /// Names of the constants this build did not provide.
    #[must_use]
    pub fn missing(&self) -> &[&'static str]
    {
        &self.missing
    }
}

/// Keeps the layout for the most recently attached target.
#[derive(Debug, Default)]
pub struct LayoutCache
{
    current: Option<(u64, Arc<Layout>)>,
}

impl LayoutCache
{
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self
    {
        Self { current: None }
    }

    /// Load the layout for `source`, reusing the previous one for the same target.
    pub fn load(&mut self, source: &dyn ConstantSource) -> Arc<Layout>
    {
        let target = source.target_id();
        if let Some((id, layout)) = &self.current {
            if *id == target {
                return Arc::clone(layout);
            }
        }

        let layout = Arc::new(Layout::load(source));
        self.current = Some((target, Arc::clone(&layout)));
        layout
    }

    /// The loaded layout, if any.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Layout>>
    {
        self.current.as_ref().map(|(_, layout)| Arc::clone(layout))
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::Cell;
    use std::collections::HashMap;

    use super::*;

    struct Table
    {
        id: u64,
        values: HashMap<String, i64>,
        lookups: Cell<usize>,
    }

    impl ConstantSource for Table
    {
        fn resolve_constant(&self, name: &str) -> Option<i64>
        {
            self.lookups.set(self.lookups.get() + 1);
            self.values.get(name).copied()
        }

        fn target_id(&self) -> u64
        {
            self.id
        }
    }

    fn table(id: u64) -> Table
    {
        let mut values = HashMap::new();
        values.insert("v8dbg_SmiTag".to_string(), 0);
        values.insert("v8dbg_class_Map__bit_field3__SMI".to_string(), 12);
        Table {
            id,
            values,
            lookups: Cell::new(0),
        }
    }

    #[test]
    fn test_missing_constants_are_recorded_not_fatal()
    {
        let layout = Layout::load(&table(1));
        assert!(layout.smi.tag.matches(0));
        assert!(!layout.regexp.source.is_available());
        assert_eq!(layout.regexp.source.raw(), -1);
        assert!(layout.missing().contains(&"class_JSRegExp__source__Object"));
        let err = layout.regexp.source.get().unwrap_err();
        assert!(format!("{err}").contains("class_JSRegExp__source__Object"));
    }

    #[test]
    fn test_alternative_name_selects_repr()
    {
        let layout = Layout::load(&table(1));
        assert!(layout.map.bit_field3.is_available());
        assert_eq!(layout.map.bit_field3.repr, Repr::Smi);
        assert_eq!(layout.map.bit_field3.offset.raw(), 12);
    }

    #[test]
    fn test_cache_is_idempotent_per_target()
    {
        let mut cache = LayoutCache::new();
        let first = table(7);
        let a = cache.load(&first);
        let lookups = first.lookups.get();
        let b = cache.load(&first);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(first.lookups.get(), lookups);

        let other = table(8);
        let c = cache.load(&other);
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(other.lookups.get() > 0);
    }
}
