//! Tests for platform-agnostic types

use hindsight_core::types::{
    Address, Architecture, NativeFrame, Registers, SourceLocation, SymbolLanguage, SymbolName, ThreadId,
};

#[test]
fn test_address_display_is_padded_hex()
{
    assert_eq!(Address::new(0x1001).to_string(), "0x0000000000001001");
    assert_eq!(Address::ZERO.to_string(), "0x0000000000000000");
}

#[test]
fn test_address_parse()
{
    assert_eq!("0x1001".parse::<Address>().unwrap(), Address::new(0x1001));
    assert_eq!("0X1001".parse::<Address>().unwrap(), Address::new(0x1001));
    assert_eq!("deadbeef".parse::<Address>().unwrap(), Address::new(0xdead_beef));
    assert_eq!(" 0x10 ".parse::<Address>().unwrap(), Address::new(0x10));
}

#[test]
fn test_address_parse_rejects_garbage()
{
    assert!("".parse::<Address>().is_err());
    assert!("0x".parse::<Address>().is_err());
    assert!("0x12g4".parse::<Address>().is_err());
    assert!("0x1_0000_0000_0000_0000".parse::<Address>().is_err());
    assert!("0x10000000000000000".parse::<Address>().is_err());
}

#[test]
fn test_address_arithmetic()
{
    let address = Address::new(0x1000);
    assert_eq!(address.offset(-8), Address::new(0xff8));
    assert_eq!(address.offset(16), Address::new(0x1010));
    assert_eq!(address.checked_sub(0x2000), None);
    assert!(Address::ZERO.is_null());
    assert_eq!(u64::from(address), 0x1000);
}

#[test]
fn test_thread_id()
{
    let thread = ThreadId::from(12345);
    assert_eq!(thread.raw(), 12345);
    assert_eq!(thread.to_string(), "12345");
    assert_eq!(thread, ThreadId(12345));
    assert_ne!(thread, ThreadId(54321));
}

#[test]
fn test_architecture()
{
    assert_eq!(Architecture::X86_64.to_string(), "x86_64");
    assert_eq!(Architecture::Arm64.to_string(), "arm64");
    assert_eq!(Architecture::Unknown("riscv64").to_string(), "riscv64");
    assert_eq!(Architecture::X86_64.pointer_size_bytes(), 8);
}

#[test]
fn test_registers_default()
{
    let regs = Registers::default();
    assert_eq!(regs.pc, Address::ZERO);
    assert_eq!(regs.sp, Address::ZERO);
    assert_eq!(regs.fp, Address::ZERO);
    assert_eq!(regs.architecture(), Architecture::X86_64);
}

#[test]
fn test_registers_new()
{
    let regs = Registers::new(Architecture::Arm64, Address::new(0x10), Address::new(0x20), Address::new(0x30));
    assert_eq!((regs.pc, regs.sp, regs.fp), (Address::new(0x10), Address::new(0x20), Address::new(0x30)));
    assert_eq!(regs.architecture(), Architecture::Arm64);
}

#[test]
fn test_source_location_display()
{
    let location = SourceLocation {
        file: "src/node.cc".to_string(),
        line: Some(42),
        column: None,
    };
    assert_eq!(location.to_string(), "src/node.cc:42:0");
    let bare = SourceLocation {
        file: "a.c".to_string(),
        line: None,
        column: None,
    };
    assert_eq!(bare.to_string(), "a.c:0:0");
}

#[test]
fn test_symbol_name_prefers_demangled()
{
    let symbol = SymbolName::new(
        "_ZN4node5StartEv".to_string(),
        Some("node::Start()".to_string()),
        SymbolLanguage::Cpp,
    );
    assert_eq!(symbol.display_name(), "node::Start()");
    assert_eq!(symbol.raw(), "_ZN4node5StartEv");
    assert_eq!(symbol.language().to_string(), "c++");

    let plain = SymbolName::new("uv_run".to_string(), None, SymbolLanguage::C);
    assert_eq!(plain.to_string(), "uv_run");
}

#[test]
fn test_bare_frame_is_not_native()
{
    let mut frame = NativeFrame::bare(0, Address::new(0x10), Address::new(0x20));
    assert!(!frame.is_native());
    frame.module = Some("/usr/bin/node".to_string());
    assert!(frame.is_native());
}
