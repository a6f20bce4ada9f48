//! Array buffers and the typed views onto them.
//!
//! A neutered (detached) buffer has no valid payload: once the flag is seen
//! nothing past it is read.

use super::{FixedArray, Heap};
use crate::error::HindsightResult;
use crate::inspect::{BufferNode, Decoder, InspectOptions, NodeKind, Page, Window};
use crate::types::Address;

heap_view!(
    /// A `JSArrayBuffer`.
    ArrayBuffer
);

impl ArrayBuffer
{
    pub fn is_neutered(&self, heap: &Heap<'_>) -> HindsightResult<bool>
    {
        let layout = &heap.layout().array_buffer;
        if !layout.was_neutered_mask.is_available() {
            return Ok(false);
        }
        let bits = heap.int(&self.0, layout.bit_field)?;
        Ok(bits & layout.was_neutered_mask.get()? != 0)
    }

    /// Address of the payload; zero when not yet materialized.
    pub fn backing_store(&self, heap: &Heap<'_>) -> HindsightResult<Address>
    {
        Ok(Address::new(heap.word(&self.0, heap.layout().array_buffer.backing_store)?))
    }

    pub fn byte_length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let length = heap.int(&self.0, heap.layout().array_buffer.byte_length)?;
        Ok(usize::try_from(length).unwrap_or(0))
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        if self.is_neutered(&heap)? {
            return Ok(NodeKind::ArrayBuffer(BufferNode {
                neutered: true,
                ..BufferNode::default()
            }));
        }
        let backing_store = self.backing_store(&heap)?;
        let byte_length = self.byte_length(&heap)?;
        Ok(NodeKind::ArrayBuffer(BufferNode {
            neutered: false,
            backing_store: Some(backing_store),
            byte_offset: None,
            byte_length: Some(byte_length),
            bytes: payload(&heap, backing_store, byte_length, options)?,
        }))
    }
}

heap_view!(
    /// A typed array or `DataView` over an [`ArrayBuffer`].
    ArrayBufferView
);

impl ArrayBufferView
{
    pub fn buffer(&self, heap: &Heap<'_>) -> HindsightResult<ArrayBuffer>
    {
        Ok(ArrayBuffer::new(heap.heap_value(&self.0, heap.layout().array_buffer_view.buffer)?))
    }

    pub fn byte_offset(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let offset = heap.int(&self.0, heap.layout().array_buffer_view.byte_offset)?;
        Ok(usize::try_from(offset).unwrap_or(0))
    }

    pub fn byte_length(&self, heap: &Heap<'_>) -> HindsightResult<usize>
    {
        let length = heap.int(&self.0, heap.layout().array_buffer_view.byte_length)?;
        Ok(usize::try_from(length).unwrap_or(0))
    }

    /// Payload address of the underlying buffer. On-heap typed arrays have no
    /// backing store yet; their data sits at base pointer plus external
    /// pointer of the elements object.
    pub fn data(&self, heap: &Heap<'_>, buffer: &ArrayBuffer) -> HindsightResult<Address>
    {
        let store = buffer.backing_store(heap)?;
        if store.value() != 0 {
            return Ok(store);
        }
        let elements = FixedArray::new(heap.heap_value(&self.0, heap.layout().js_object.elements)?);
        let layout = &heap.layout().fixed_typed_array;
        let base = heap.word(elements.object(), layout.base_pointer)?;
        let external = heap.word(elements.object(), layout.external_pointer)?;
        Ok(Address::new(base.wrapping_add(external)))
    }

    pub fn decode(&self, cx: &Decoder<'_>, options: &InspectOptions) -> HindsightResult<NodeKind>
    {
        let heap = cx.heap();
        let buffer = self.buffer(&heap)?;
        if buffer.is_neutered(&heap)? {
            return Ok(NodeKind::ArrayBufferView(BufferNode {
                neutered: true,
                ..BufferNode::default()
            }));
        }
        let data = self.data(&heap, &buffer)?;
        let byte_offset = self.byte_offset(&heap)?;
        let byte_length = self.byte_length(&heap)?;
        let bytes = payload(&heap, data.offset(byte_offset as i64), byte_length, options)?;
        Ok(NodeKind::ArrayBufferView(BufferNode {
            neutered: false,
            backing_store: Some(data),
            byte_offset: Some(byte_offset),
            byte_length: Some(byte_length),
            bytes,
        }))
    }
}

/// Hex bytes of the requested window; the text limit caps an open-ended request.
fn payload(
    heap: &Heap<'_>,
    start: Address,
    byte_length: usize,
    options: &InspectOptions,
) -> HindsightResult<Option<Page<String>>>
{
    if !options.detailed {
        return Ok(None);
    }
    let text = options.for_text();
    let window = Window::new(text.current, text.limit, byte_length);
    let bytes = if window.is_empty() {
        Vec::new()
    } else {
        heap.memory().bytes(start.offset(window.start() as i64), window.len())?
    };
    let items = bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    Ok(Some(Page::new(items, window)))
}
