//! `chainslots layout` and `chainslots base-slot`: offline inspection, no RPC.

use anyhow::Result;
use serde_json::json;

use chainslots_core::config::parse_slot;
use chainslots_core::{dynamic_array_base_slot, ArrayDescriptor, StorageWord, U256};

use crate::descriptor_args::DescriptorArgs;

pub fn run_layout(args: &DescriptorArgs, as_json: bool) -> Result<()> {
    let (descriptor, _) = args.resolve()?;
    println!("{}", render_layout(&descriptor, as_json)?);
    Ok(())
}

pub fn run_base_slot(slot: &str) -> Result<()> {
    let slot = parse_slot(slot)?;
    println!("{}", StorageWord::from_u256(dynamic_array_base_slot(slot)));
    Ok(())
}

pub fn render_layout(descriptor: &ArrayDescriptor, as_json: bool) -> Result<String> {
    let base = dynamic_array_base_slot(descriptor.declared_slot);
    if as_json {
        let value = json!({
            "name": descriptor.name,
            "declared_slot": format_slot(descriptor.declared_slot),
            "data_base_slot": format_slot(base),
            "slots_per_element": descriptor.slots_per_element,
            "fields": descriptor.fields,
        });
        return Ok(serde_json::to_string_pretty(&value)?);
    }

    let mut out = vec![
        format!("array:             {}", descriptor.name),
        format!("declared slot:     {}", format_slot(descriptor.declared_slot)),
        format!("data base slot:    {}", format_slot(base)),
        format!("slots per element: {}", descriptor.slots_per_element),
        String::new(),
        format!("{:<20} {:<8} {:>4} {:>10}", "FIELD", "TYPE", "WORD", "BITS"),
    ];
    for f in &descriptor.fields {
        out.push(format!(
            "{:<20} {:<8} {:>4} {:>10}",
            f.name,
            f.kind.to_string(),
            f.word_index,
            format!("{}..{}", f.bit_offset, u32::from(f.bit_offset) + u32::from(f.bit_width)),
        ));
    }
    Ok(out.join("\n"))
}

fn format_slot(slot: U256) -> String {
    format!("0x{slot:x}")
}
