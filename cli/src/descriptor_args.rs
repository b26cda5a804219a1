//! Descriptor selection shared by `decode` and `layout`.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

use chainslots_core::config::{build_descriptor, parse_slot};
use chainslots_core::{ArrayDescriptor, DescriptorFile, FieldSpec};

#[derive(Debug, Clone, Args)]
pub struct DescriptorArgs {
    /// YAML descriptor file (name, slot, fields)
    #[arg(short, long, conflicts_with_all = ["slot", "field", "name", "slots_per_element"])]
    pub descriptor: Option<PathBuf>,

    /// Declared storage slot of the array (decimal or 0x hex)
    #[arg(long)]
    pub slot: Option<String>,

    /// Struct member as name:type, or name:type@word:offset to pin it; repeat in declaration order
    #[arg(long = "field", value_name = "NAME:TYPE")]
    pub field: Vec<String>,

    /// Array name used in output lines (descriptor files carry their own)
    #[arg(long, default_value = "array")]
    pub name: String,

    /// Words per element (default: derived from the fields)
    #[arg(long)]
    pub slots_per_element: Option<u32>,
}

impl DescriptorArgs {
    /// Build the descriptor and, when one was given, return the parsed file
    /// for its address / RPC defaults.
    pub fn resolve(&self) -> Result<(ArrayDescriptor, Option<DescriptorFile>)> {
        if let Some(path) = &self.descriptor {
            let file = DescriptorFile::load(path)
                .with_context(|| format!("loading descriptor {}", path.display()))?;
            let descriptor = file
                .descriptor()
                .with_context(|| format!("in descriptor {}", path.display()))?;
            return Ok((descriptor, Some(file)));
        }

        let Some(slot) = &self.slot else {
            bail!("either --descriptor or --slot with --field is required");
        };
        if self.field.is_empty() {
            bail!("at least one --field is required with --slot");
        }

        let slot = parse_slot(slot)?;
        let fields = self
            .field
            .iter()
            .map(|f| f.parse::<FieldSpec>().with_context(|| format!("bad --field '{f}'")))
            .collect::<Result<Vec<_>>>()?;
        let descriptor = build_descriptor(self.name.clone(), slot, self.slots_per_element, &fields)?;
        Ok((descriptor, None))
    }
}
