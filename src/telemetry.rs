//! Tracing setup for the idea service.
//!
//! `LOG_LEVEL` takes a filter directive; when absent or unparsable the service logs
//! generation outcomes (`idea`) and session events (`muin_backend`) at debug, the rest at info.
//! `LOG_FORMAT=json` switches to one JSON object per line for log shippers.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,idea=debug,muin_backend=debug,tower_http=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
  Pretty,
  Json,
}

impl LogFormat {
  fn parse(raw: Option<&str>) -> Self {
    match raw.map(str::trim) {
      Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
      _ => LogFormat::Pretty,
    }
  }
}

fn filter_from(directive: Option<&str>) -> EnvFilter {
  directive
    .and_then(|d| EnvFilter::try_new(d).ok())
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
  let directive = std::env::var("LOG_LEVEL").ok();
  let format = LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref());

  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter_from(directive.as_deref()))
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}
