//! Scan command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hexpatch::{SectionMap, Signature};

/// Run the scan command
pub fn run(module_dir: &Path, module: &str, pattern: &str, limit: usize) -> Result<()> {
    let path = module_dir.join(module);
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let signature: Signature = pattern.parse()?;
    // RVAs are only available for PE images
    let sections = SectionMap::from_pe_bytes(&bytes).ok();

    println!(
        "Searching {} ({} bytes) for {}",
        path.display(),
        bytes.len(),
        signature
    );

    let matches = signature.find_all(&bytes);
    for (index, offset) in matches.iter().take(limit).enumerate() {
        let rva = sections
            .as_ref()
            .and_then(|s| s.file_offset_to_rva(*offset as u64))
            .map(|rva| format!("0x{:X}", rva))
            .unwrap_or_else(|| "-".to_string());
        println!("  #{:<3} file 0x{:08X}  rva {}", index, offset, rva);
    }

    if matches.len() > limit {
        println!("  ... {} more", matches.len() - limit);
    }
    println!("{} match(es)", matches.len());
    Ok(())
}
