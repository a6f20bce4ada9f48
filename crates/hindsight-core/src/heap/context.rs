//! Function contexts and their scope metadata.
//!
//! Both are laid out like fixed arrays. A context's first few slots hold the
//! closure, the enclosing context and the scope info; its named locals follow
//! from `min_context_slots` on. The scope info names them.

use super::{FixedArray, Heap, JsString, StringText};
use crate::error::{HindsightError, HindsightResult};
use crate::inspect::{ContextNode, Decoder, InspectOptions, NodeKind, Property, PropertyValue, ScopeInfoNode};
use crate::layout::Constant;
use crate::value::Value;

heap_view!(
    /// A function, block or script context.
    Context
);

impl Context
{
    fn slot(&self, heap: &Heap<'_>, index: Constant) -> HindsightResult<Value>
    {
        let index = usize::try_from(index.get()?).map_err(|_| HindsightError::layout("negative context slot"))?;
        FixedArray::new(self.0.clone()).get(heap, index)
    }

    /// The enclosing context.
    pub fn previous(&self, heap: &Heap<'_>) -> HindsightResult<Value>
    {
        self.slot(heap, heap.layout().context.previous_index)
    }

    /// The closure; only builds that export the closure slot have one.
    pub fn closure(&self, heap: &Heap<'_>) -> HindsightResult<Option<Value>>
    {
        let index = heap.layout().context.closure_index;
        if !index.is_available() {
            return Ok(None);
        }
        let closure = self.slot(heap, index)?;
        Ok(heap.is_type(&closure, heap.layout().types.js_function)?.then_some(closure))
    }

    pub fn scope_info(&self, heap: &Heap<'_>) -> HindsightResult<ScopeInfo>
    {
        let value = self.slot(heap, heap.layout().context.scope_info_index)?;
        value
            .as_heap()
            .cloned()
            .map(ScopeInfo::new)
            .ok_or_else(|| HindsightError::layout(format!("context {} has no scope info", self.0.raw())))
    }

    /// Value of context local `index`.
    pub fn local(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<Value>
    {
        let first = usize::try_from(heap.layout().context.min_context_slots.get()?).unwrap_or(0);
        FixedArray::new(self.0.clone()).get(heap, first + index)
    }

    /// Named locals as `(name, value)` pairs.
    pub fn locals(&self, heap: &Heap<'_>) -> HindsightResult<Vec<(String, Value)>>
    {
        let scope = self.scope_info(heap)?;
        let count = scope.context_local_count(heap)?;
        (0..usize::try_from(count).unwrap_or(0))
            .map(|index| Ok((scope.context_local_name(heap, index)?, self.local(heap, index)?)))
            .collect()
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        if !options.detailed {
            return Ok(NodeKind::Context(ContextNode::default()));
        }
        let heap = cx.heap();
        let summary = options.summary();
        let child = options.child();

        let previous = self.previous(&heap)?.as_heap().map(|object| object.raw());
        let (closure, scope_info) = match self.closure(&heap)? {
            Some(closure) => (Some(Box::new(cx.value(&closure, &summary)?)), None),
            None => {
                let scope = self.scope_info(&heap)?;
                (None, Some(Box::new(cx.object(scope.object(), &summary)?)))
            }
        };
        let locals = self
            .locals(&heap)?
            .into_iter()
            .map(|(key, value)| {
                Ok(Property {
                    key,
                    value: PropertyValue::Node(Box::new(cx.value(&value, &child)?)),
                })
            })
            .collect::<HindsightResult<Vec<_>>>()?;

        Ok(NodeKind::Context(ContextNode {
            previous,
            closure,
            scope_info,
            locals,
        }))
    }
}

heap_view!(
    /// Parameter and local counts of a scope, followed by the local names.
    ScopeInfo
);

impl ScopeInfo
{
    fn count(&self, heap: &Heap<'_>, index: Constant) -> HindsightResult<i64>
    {
        if !index.is_available() {
            return Ok(0);
        }
        let index = usize::try_from(index.get()?).map_err(|_| HindsightError::layout("negative scope info slot"))?;
        let value = FixedArray::new(self.0.clone()).get(heap, index)?;
        value
            .as_smi()
            .ok_or_else(|| HindsightError::layout(format!("scope info {} count is not a Smi", self.0.raw())))
    }

    pub fn parameter_count(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        self.count(heap, heap.layout().scope_info.parameter_count)
    }

    pub fn stack_local_count(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        self.count(heap, heap.layout().scope_info.stack_local_count)
    }

    pub fn context_local_count(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        self.count(heap, heap.layout().scope_info.context_local_count)
    }

    /// Slot of the first context local name.
    fn names_start(&self, heap: &Heap<'_>) -> HindsightResult<i64>
    {
        let layout = &heap.layout().scope_info;
        let mut start = layout.variable_part.get()?;
        if layout.embeds_stack_locals() {
            start += self.parameter_count(heap)? + self.stack_local_count(heap)?;
        }
        Ok(start)
    }

    fn string_slot(&self, heap: &Heap<'_>, slot: i64) -> HindsightResult<Option<String>>
    {
        let slot = usize::try_from(slot).map_err(|_| HindsightError::layout(format!("scope info slot {slot}")))?;
        let value = FixedArray::new(self.0.clone()).get(heap, slot)?;
        if !heap.is_string(&value)? {
            return Ok(None);
        }
        match value.as_heap() {
            Some(object) => JsString::new(object.clone()).text(heap, StringText::Unicode).map(Some),
            None => Ok(None),
        }
    }

    /// Name of context local `index`; a non-string name is a layout error.
    pub fn context_local_name(&self, heap: &Heap<'_>, index: usize) -> HindsightResult<String>
    {
        let slot = self.names_start(heap)? + index as i64;
        self.string_slot(heap, slot)?
            .ok_or_else(|| HindsightError::layout(format!("context local {index} has no name")))
    }

    /// The function name slot, past the context local names and their info
    /// words. Absent (not an error) when the slot holds no string.
    pub fn function_name(&self, heap: &Heap<'_>) -> HindsightResult<Option<String>>
    {
        let slot = self.names_start(heap)? + 2 * self.context_local_count(heap)?;
        if slot >= FixedArray::new(self.0.clone()).length(heap)? as i64 {
            return Ok(None);
        }
        Ok(self.string_slot(heap, slot)?.filter(|name| !name.is_empty()))
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let context_local_count = self.context_local_count(&heap)?;
        let local_names = if options.detailed {
            (0..usize::try_from(context_local_count).unwrap_or(0))
                .map(|index| self.context_local_name(&heap, index))
                .collect::<HindsightResult<Vec<_>>>()?
        } else {
            Vec::new()
        };
        Ok(NodeKind::ScopeInfo(ScopeInfoNode {
            parameter_count: self.parameter_count(&heap)?,
            stack_local_count: self.stack_local_count(&heap)?,
            context_local_count,
            function_name: self.function_name(&heap)?,
            local_names,
        }))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::mock::HeapBuilder;
    use crate::value::HeapObject;

    #[test]
    fn test_locals_are_named_past_parameters()
    {
        let mut builder = HeapBuilder::new();
        let scope = builder.scope_info(2, &["count", "label"], Some("tick"));
        let seven = builder.smi(7);
        let text = builder.one_byte_string("ok");
        let context = builder.context(None, None, scope, &[seven, text.value()]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let heap = Heap::new(&memory, &layout);

        let context = Context::new(HeapObject::new(context));
        let scope = context.scope_info(&heap).unwrap();
        assert_eq!(scope.parameter_count(&heap).unwrap(), 2);
        assert_eq!(scope.function_name(&heap).unwrap().as_deref(), Some("tick"));
        let locals = context.locals(&heap).unwrap();
        assert_eq!(locals.len(), 2);
        assert_eq!(locals[0].0, "count");
        assert_eq!(locals[0].1.as_smi(), Some(7));
        assert_eq!(locals[1].0, "label");
    }

    #[test]
    fn test_context_text()
    {
        let mut builder = HeapBuilder::new();
        let scope = builder.scope_info(0, &["n"], None);
        let one = builder.smi(1);
        let outer = builder.context(None, None, scope, &[one]);
        let inner = builder.context(None, Some(outer), scope, &[one]);
        let layout = builder.layout().clone();
        let memory = builder.finish();
        let cx = Decoder::new(Heap::new(&memory, &layout));

        let options = InspectOptions {
            detailed: true,
            ..InspectOptions::default()
        };
        let text = cx.object(&HeapObject::new(inner), &options).unwrap().to_string();
        assert!(text.starts_with("<Context: {"), "{text}");
        assert!(text.contains(&format!("(previous)={outer}:<Context>")), "{text}");
        assert!(text.contains("(scope_info)="), "{text}");
        assert!(text.contains("n=<Smi: 1>"), "{text}");

        let summary = cx.object(&HeapObject::new(inner), &InspectOptions::default()).unwrap();
        assert_eq!(summary.to_string(), "<Context>");
    }
}
