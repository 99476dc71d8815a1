//! Generated native project - synthesized driver unit and on-disk layout
//!
//! Produces:
//! - a `main` unit that initializes the runtime, calls the entry symbol and prints
//!   `Result(<value>), <ticks>ms`
//! - `<gen root>/<escaped test name>/` holding `<unit>.h` and `<unit>.cpp` for every unit

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use testbed_core::{CompileUnit, EntrySymbol, UnitSet};

/// Name of the synthesized driver unit.
pub const MAIN_UNIT: &str = "main";

/// `<image dir>/../../<generated root>/<escaped name>`, made absolute against the current directory.
pub fn generated_dir(image_dir: &Path, generated_root: &str, escaped_name: &str) -> io::Result<PathBuf> {
    let dir = image_dir.join("..").join("..").join(generated_root).join(escaped_name);
    std::path::absolute(dir)
}

/// Driver unit that runs `entry` once and reports its return value.
pub fn main_unit(entry: &EntrySymbol, runtime_init: &str) -> CompileUnit {
    let mut unit = CompileUnit::new(MAIN_UNIT);
    unit.impl_depends.push(entry.unit.clone());
    unit.impl_code = format!(
        "#include <stdio.h>\n\
         #include <time.h>\n\
         #include <string>\n\
         \n\
         int main()\n\
         {{\n\
         \t{init}();\n\
         \tauto start = clock();\n\
         \tauto result = {entry}();\n\
         \tauto elapsed = clock() - start;\n\
         \tprintf(\"Result(%s), %ldms\", std::to_string(result).c_str(), elapsed);\n\
         \treturn 0;\n\
         }}\n",
        init = runtime_init,
        entry = entry.symbol,
    );
    unit
}

/// Append the driver unit for `entry` to the set.
pub fn add_main_unit(units: &mut UnitSet, entry: &EntrySymbol, runtime_init: &str) {
    units.push(main_unit(entry, runtime_init));
}

fn is_unit_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("h" | "cpp"))
}

/// Write every unit into `dir` so that its `.h`/`.cpp` files match `units` exactly.
///
/// Files whose bytes are unchanged are left alone so incremental builds keep their timestamps;
/// unit files not in the set are removed.
#[tracing::instrument(skip_all, fields(dir = %dir.display(), units = units.len()))]
pub fn persist_units(dir: &Path, units: &UnitSet) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    let mut keep = HashSet::new();
    for unit in &units.units {
        for (ext, code) in [("h", &unit.decl_code), ("cpp", &unit.impl_code)] {
            let path = dir.join(format!("{}.{}", unit.name, ext));
            write_if_changed(&path, code.as_bytes())?;
            keep.insert(path);
        }
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_unit_file(&path) && !keep.contains(&path) {
            tracing::debug!(path = %path.display(), "removing stale unit file");
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn write_if_changed(path: &Path, data: &[u8]) -> io::Result<()> {
    match fs::read(path) {
        Ok(existing) if existing == data => Ok(()),
        _ => fs::write(path, data),
    }
}
