use std::{
    io::Write,
    sync::OnceLock,
    time::{Duration, Instant},
};

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

static BOOT: OnceLock<Instant> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct ConsoleLoggerConfig {
    pub level: LevelFilter,
    pub colors: bool,
    pub include_module: bool,
}

impl ConsoleLoggerConfig {
    pub fn from_env() -> Self {
        let level = std::env::var("MOONIMPACT_LOG")
            .ok()
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let colors = std::env::var("MOONIMPACT_LOG_COLORS")
            .ok()
            .map(|v| v != "0")
            .unwrap_or(true);
        let include_module = std::env::var("MOONIMPACT_LOG_MODULE")
            .ok()
            .map(|v| v != "0")
            .unwrap_or(true);

        Self {
            level,
            colors,
            include_module,
        }
    }
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Install the process-wide `env_logger` backend.
///
/// Lines look like `[+mm:ss.mmm] [INFO ] target message`, stamped with
/// uptime since the first call.
pub fn init_console_logger(config: &ConsoleLoggerConfig) -> anyhow::Result<()> {
    BOOT.get_or_init(Instant::now);

    let mut builder = Builder::new();
    builder.filter_level(config.level);
    builder.write_style(if config.colors { WriteStyle::Auto } else { WriteStyle::Never });

    let include_module = config.include_module;
    builder.format(move |buf, record| {
        let stamp = fmt_uptime(BOOT.get().map(Instant::elapsed).unwrap_or_default());
        let style = buf.default_level_style(record.level());

        if include_module {
            writeln!(
                buf,
                "[{stamp}] [{style}{:<5}{style:#}] {:<25} {}",
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "[{stamp}] [{style}{:<5}{style:#}] {}",
                record.level(),
                record.args()
            )
        }
    });

    builder
        .try_init()
        .map_err(|e| anyhow::anyhow!("logger init failed: {e}"))
}

/// mm:ss.mmm (or hh:mm:ss.mmm once past an hour)
pub fn fmt_uptime(d: Duration) -> String {
    let total_ms = d.as_millis() as u64;

    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;

    let s = total_s % 60;
    let total_m = total_s / 60;

    let m = total_m % 60;
    let h = total_m / 60;

    if h > 0 {
        format!("+{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
    } else {
        format!("+{:02}:{:02}.{:03}", m, s, ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_formats() {
        assert_eq!(fmt_uptime(Duration::from_millis(61_005)), "+01:01.005");
        assert_eq!(fmt_uptime(Duration::from_secs(3_723)), "+01:02:03.000");
    }
}
