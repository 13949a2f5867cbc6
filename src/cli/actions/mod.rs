pub mod run;

use secrecy::SecretString;

/// Exporter actions dispatched from the CLI.
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        metrics_path: String,
        dsn: SecretString,
        collectors: Vec<String>,
    },
}
