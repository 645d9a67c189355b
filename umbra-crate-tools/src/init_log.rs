use std::io::Write;

use anstyle::{AnsiColor, Color, Style};

/// 初始化全局 logger，级别默认 Info，`RUST_LOG` 可以覆盖
///
/// 可以重复调用，之后的调用不生效
pub fn init_log() {
    let result = env_logger::Builder::new()
        .filter(None, log::LevelFilter::Info)
        // naga 解析 SPIR-V 时的 debug 输出
        .filter(Some("naga"), log::LevelFilter::Warn)
        .parse_default_env()
        .format(|buf, record| {
            let level = level_style(record.level());
            let dim = Style::new().dimmed();
            writeln!(
                buf,
                "{dim}{}{dim:#} {level}{:<5}{level:#} {dim}{}:{}{dim:#} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                short_file_name(record.file().unwrap_or("?")),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();

    if result.is_err() {
        log::debug!("logger is already set");
    }
}

fn level_style(level: log::Level) -> Style {
    let color = match level {
        log::Level::Error => AnsiColor::Red,
        log::Level::Warn => AnsiColor::Yellow,
        log::Level::Info => AnsiColor::Green,
        log::Level::Debug => AnsiColor::Blue,
        log::Level::Trace => AnsiColor::Magenta,
    };
    Style::new().fg_color(Some(Color::Ansi(color))).bold()
}

/// 路径的最后一段，`/` 和 `\` 都视为分隔符
fn short_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_trimmed_for_both_separators() {
        assert_eq!(short_file_name("engine/crates/umbra-gfx/src/gfx.rs"), "gfx.rs");
        assert_eq!(short_file_name("engine\\crates\\umbra-gfx\\src\\gfx.rs"), "gfx.rs");
        assert_eq!(short_file_name("lib.rs"), "lib.rs");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_log();
        init_log();
    }
}
