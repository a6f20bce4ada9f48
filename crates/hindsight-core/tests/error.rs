//! Tests for error handling

use hindsight_core::error::{HindsightError, HindsightResult};
use hindsight_core::Address;

#[test]
fn test_memory_read_display()
{
    let error = HindsightError::MemoryRead {
        address: Address::new(0x1000),
        length: 8,
    };
    let message = format!("{}", error);
    assert_eq!(message, "Failed to read 8 bytes at 0x0000000000001000");
}

#[test]
fn test_layout_unavailable_names_constant()
{
    let error = HindsightError::LayoutUnavailable("class_Map__instance_type__uint16_t");
    let message = format!("{}", error);
    assert!(message.contains("class_Map__instance_type__uint16_t"));
}

#[test]
fn test_unrecognized_layout()
{
    let error = HindsightError::UnrecognizedLayout("unknown frame marker 77".to_string());
    assert_eq!(format!("{}", error), "Unrecognized layout: unknown frame marker 77");
}

#[test]
fn test_invalid_address_format()
{
    let error = "0xnope".parse::<Address>().unwrap_err();
    assert!(matches!(error, HindsightError::InvalidAddressFormat(ref text) if text == "0xnope"));
    assert!(format!("{}", error).contains("Invalid address format"));
}

#[test]
fn test_invalid_argument()
{
    let error = HindsightError::InvalidArgument("no thread at index 3".to_string());
    let message = format!("{}", error);
    assert!(message.contains("Invalid argument"));
    assert!(message.contains("3"));
}

#[test]
fn test_target_format()
{
    let error = HindsightError::TargetFormat("not an ELF core file".to_string());
    assert!(format!("{}", error).contains("not an ELF core file"));
}

#[test]
fn test_io_error_conversion()
{
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "core not found");
    let error: HindsightError = io_error.into();
    let message = format!("{}", error);
    assert!(message.contains("IO error"));
    assert!(message.contains("core not found"));
}

#[test]
fn test_result_type_alias()
{
    fn returns_ok() -> HindsightResult<i32>
    {
        Ok(42)
    }

    fn returns_err() -> HindsightResult<i32>
    {
        Err(HindsightError::InvalidArgument("test".to_string()))
    }

    assert_eq!(returns_ok().unwrap(), 42);
    assert!(returns_err().is_err());
}

#[test]
fn test_error_debug_format()
{
    let error = HindsightError::InvalidArgument("test".to_string());
    let debug = format!("{:?}", error);
    assert!(debug.contains("InvalidArgument"));
}
