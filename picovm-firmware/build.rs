//! Build script for picovm-firmware
//!
//! - Picks the board from the enabled Cargo feature
//! - Copies the board's memory layout to memory.x and sets link arguments
//! - Validates boards/<board>.toml and generates `board_config.rs`

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Boards this firmware knows, by Cargo feature
const BOARDS: &[&str] = &["stm32f103rb", "rp2040"];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let board = selected_board();
    setup_linker(board);

    let config = load_config(board);
    let generated = validate_config(board, &config);

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("board_config.rs"), generated).unwrap();

    println!("cargo:warning=boards/{}.toml validated successfully", board);
}

/// Board named by the single enabled board feature
fn selected_board() -> &'static str {
    let enabled: Vec<&str> = BOARDS
        .iter()
        .copied()
        .filter(|board| {
            let var = format!("CARGO_FEATURE_{}", board.to_uppercase());
            env::var_os(var).is_some()
        })
        .collect();

    match enabled.as_slice() {
        [board] => *board,
        _ => panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: exactly one board feature must be enabled                ║\n\
            ║                                                                  ║\n\
            ║  Build with one of:                                              ║\n\
            ║    --features stm32f103rb --target thumbv7m-none-eabi            ║\n\
            ║    --features rp2040 --target thumbv6m-none-eabi                 ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        ),
    }
}

/// Set up memory.x and the linker scripts for `board`
fn setup_linker(board: &str) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let layout = format!("memory-{}.x", board);

    fs::copy(&layout, out_dir.join("memory.x")).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed={}", layout);

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    if board == "rp2040" {
        println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    }
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
}

/// Read and parse boards/<board>.toml
fn load_config(board: &str) -> toml::Value {
    let path = format!("boards/{}.toml", board);
    println!("cargo:rerun-if-changed={}", path);

    if !Path::new(&path).exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board configuration not found!                           ║\n\
            ║                                                                  ║\n\
            ║  Expected: {:<54}║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            path
        );
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read {:<42}║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                path, e
            );
        }
    };

    match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in {:<34}║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                path,
                format_error_lines(&error_msg)
            );
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fail the build with a list of configuration errors
fn report(title: &str, errors: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

/// Look up `section.key` as a positive integer
fn positive(config: &toml::Value, section: &str, key: &str, errors: &mut Vec<String>) -> i64 {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(v)) if *v > 0 => *v,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!("[{}] {} must be greater than 0", section, key));
            0
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            0
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            0
        }
    }
}

/// Look up `section.key` as a string
fn string<'a>(
    config: &'a toml::Value,
    section: &str,
    key: &str,
    errors: &mut Vec<String>,
) -> &'a str {
    match config.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::String(s)) => s,
        Some(_) => {
            errors.push(format!("[{}] {} must be a string", section, key));
            ""
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            ""
        }
    }
}

/// Validate every section and render the generated constants
fn validate_config(board: &str, config: &toml::Value) -> String {
    let mut errors = Vec::new();

    for section in ["board", "serial", "memory", "store"] {
        if config.get(section).is_none() {
            errors.push(format!("Missing [{}] section", section));
        }
    }
    if !errors.is_empty() {
        report("Missing required sections", &errors);
    }

    // [board]
    let name = string(config, "board", "name", &mut errors);
    if !name.is_empty() && name != board {
        errors.push(format!(
            "[board] name '{}' does not match feature '{}'",
            name, board
        ));
    }
    let clock_hz = positive(config, "board", "clock_hz", &mut errors);
    let tick_hz = positive(config, "board", "tick_hz", &mut errors);
    if tick_hz > clock_hz {
        errors.push("[board] tick_hz cannot exceed clock_hz".to_string());
    }
    if clock_hz > u32::MAX as i64 {
        errors.push("[board] clock_hz does not fit in 32 bits".to_string());
    }

    // [serial]
    let bitrate = positive(config, "serial", "bitrate", &mut errors);
    let rx_buffer = positive(config, "serial", "rx_buffer", &mut errors);
    let tx_buffer = positive(config, "serial", "tx_buffer", &mut errors);
    for (key, size) in [("rx_buffer", rx_buffer), ("tx_buffer", tx_buffer)] {
        if size != 0 && (size < 2 || size & (size - 1) != 0) {
            errors.push(format!("[serial] {} must be a power of two >= 2", key));
        }
    }
    let rx_overflow = match string(config, "serial", "rx_overflow", &mut errors) {
        "drop-newest" => "DropNewest",
        "overwrite-oldest" => "OverwriteOldest",
        other => {
            errors.push(format!(
                "[serial] unknown rx_overflow '{}' (drop-newest, overwrite-oldest)",
                other
            ));
            ""
        }
    };
    let rx_underflow = match string(config, "serial", "rx_underflow", &mut errors) {
        "sentinel" => "Sentinel",
        "stale-slot" => "StaleSlot",
        other => {
            errors.push(format!(
                "[serial] unknown rx_underflow '{}' (sentinel, stale-slot)",
                other
            ));
            ""
        }
    };

    // [memory]
    let code_size = positive(config, "memory", "code_size", &mut errors);
    let heap_size = positive(config, "memory", "heap_size", &mut errors);

    // [[store.region]]
    let regions = validate_regions(config, &mut errors);
    let capacity: i64 = regions.iter().map(|(_, len)| len).sum();
    if code_size > capacity {
        errors.push(format!(
            "[memory] code_size {} exceeds store capacity {}",
            code_size, capacity
        ));
    }

    if !errors.is_empty() {
        report(&format!("Invalid configuration in boards/{}.toml", board), &errors);
    }

    let regions = regions
        .iter()
        .map(|(base, len)| format!("    VirtualRegion::new({:#06x}, {}),\n", base, len))
        .collect::<String>();

    format!(
        "pub const BOARD_NAME: &str = {name:?};\n\
         pub const CLOCK_HZ: u32 = {clock_hz};\n\
         pub const TICK_HZ: u32 = {tick_hz};\n\
         pub const UART_BITRATE: u32 = {bitrate};\n\
         pub const RX_BUFFER_SIZE: usize = {rx_buffer};\n\
         pub const TX_BUFFER_SIZE: usize = {tx_buffer};\n\
         pub const SERIAL_POLICY: SerialPolicy = SerialPolicy {{\n    \
             rx_overflow: RxOverflow::{rx_overflow},\n    \
             rx_underflow: RxUnderflow::{rx_underflow},\n\
         }};\n\
         pub const CODE_SIZE: usize = {code_size};\n\
         pub const HEAP_SIZE: usize = {heap_size};\n\
         pub const STORE_REGIONS: &[VirtualRegion] = &[\n{regions}];\n"
    )
}

/// Check the emulated EEPROM regions, returning (base_tag, len) pairs
fn validate_regions(config: &toml::Value, errors: &mut Vec<String>) -> Vec<(i64, i64)> {
    let entries = match config.get("store").and_then(|s| s.get("region")) {
        Some(toml::Value::Array(entries)) if !entries.is_empty() => entries,
        Some(toml::Value::Array(_)) => {
            errors.push("[store] at least one [[store.region]] is required".to_string());
            return Vec::new();
        }
        _ => {
            errors.push("[store] missing [[store.region]] entries".to_string());
            return Vec::new();
        }
    };

    let mut regions = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        let base = entry.get("base_tag").and_then(toml::Value::as_integer);
        let len = entry.get("len").and_then(toml::Value::as_integer);
        let (Some(base), Some(len)) = (base, len) else {
            errors.push(format!("[[store.region]] {} needs integer base_tag and len", i));
            continue;
        };
        if len <= 0 {
            errors.push(format!("[[store.region]] {} len must be greater than 0", i));
            continue;
        }
        // Tag 0xFFFF is reserved by the emulation layer
        if base < 0 || base + len > 0xFFFF {
            errors.push(format!(
                "[[store.region]] {} tags {:#x}..{:#x} leave 0x0000..0xFFFE",
                i,
                base,
                base + len
            ));
            continue;
        }
        regions.push((base, len));
    }

    for (i, &(base_a, len_a)) in regions.iter().enumerate() {
        for &(base_b, len_b) in &regions[i + 1..] {
            if base_a < base_b + len_b && base_b < base_a + len_a {
                errors.push(format!(
                    "[[store.region]] tags at {:#x} and {:#x} overlap",
                    base_a, base_b
                ));
            }
        }
    }

    regions
}
