//! Logging setup for the canvas server.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Library target whose events are always enabled at the default level.
const LIBRARY_TARGET: &str = "canvas_server";

/// Build the default filter directive when `RUST_LOG` is not set.
///
/// Both the library crate and the binary target log at `default_log_level`.
/// A binary sharing the library's target name gets a single directive.
fn default_directive(binary_name: &str, default_log_level: &str) -> String {
    let bin = binary_name.replace('-', "_");
    if bin == LIBRARY_TARGET {
        format!("{LIBRARY_TARGET}={default_log_level}")
    } else {
        format!("{LIBRARY_TARGET}={default_log_level},{bin}={default_log_level}")
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_log_level`.
///
/// ```no_run
/// use canvas_shared::logger::setup_logger;
///
/// setup_logger("canvas-server", "info");
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(binary_name, default_log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_covers_library_and_binary() {
        // テスト項目: ライブラリとバイナリの両方にログレベルが設定される
        // given (前提条件):
        let binary_name = "canvas-bench";

        // when (操作):
        let directive = default_directive(binary_name, "debug");

        // then (期待する結果):
        assert_eq!(directive, "canvas_server=debug,canvas_bench=debug");
    }

    #[test]
    fn test_default_directive_is_not_duplicated_for_server_binary() {
        // テスト項目: バイナリ名がライブラリと同じ場合はディレクティブが 1 つだけになる
        // given (前提条件):
        let binary_name = "canvas-server";

        // when (操作):
        let directive = default_directive(binary_name, "info");

        // then (期待する結果):
        assert_eq!(directive, "canvas_server=info");
    }

    #[test]
    fn test_default_directive_parses_as_env_filter() {
        // テスト項目: 生成したディレクティブが EnvFilter として解釈できる
        // given (前提条件):
        let directive = default_directive("bench", "warn");

        // when (操作):
        let result = EnvFilter::try_new(&directive);

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
