use std::fs;

use super::die;

pub fn settings_export() {
    print!("{}", kb_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        kb_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: selection.max_records={}, housekeeping.sync_interval_secs={}, housekeeping.memory_trim_delay_secs={}",
        s.selection.max_records,
        s.housekeeping.sync_interval_secs,
        s.housekeeping.memory_trim_delay_secs
    );
    println!(
        "    compat: {} web field, {} tail-move, {} no-fullscreen package(s)",
        s.compat.web_field_packages.len(),
        s.compat.ignore_tail_move_packages.len(),
        s.compat.fullscreen_unsupported_packages.len()
    );
}
