use crate::cli::actions::Action;
use crate::exporter::new;
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the exporter fails to start
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            port,
            listen,
            metrics_path,
            dsn,
            collectors,
        } => {
            new(port, listen, metrics_path, dsn, collectors).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[tokio::test]
    async fn test_handle_rejects_malformed_dsn() {
        let action = Action::Run {
            port: 0,
            listen: None,
            metrics_path: "/metrics".to_string(),
            dsn: SecretString::from("not a dsn"),
            collectors: vec!["global_status".to_string()],
        };

        let result = handle(action).await;
        assert!(result.is_err(), "Should fail on an unparsable DSN");
    }

    #[test]
    fn test_action_creation() {
        let action = Action::Run {
            port: 9104,
            listen: Some("127.0.0.1".to_string()),
            metrics_path: "/metrics".to_string(),
            dsn: SecretString::from("mysql://sphinx@localhost:9306/"),
            collectors: vec!["global_status".to_string(), "exporter".to_string()],
        };

        match action {
            Action::Run {
                port,
                listen,
                metrics_path,
                dsn: _,
                collectors,
            } => {
                assert_eq!(port, 9104);
                assert_eq!(listen, Some("127.0.0.1".to_string()));
                assert_eq!(metrics_path, "/metrics");
                assert!(collectors.contains(&"global_status".to_string()));
                assert!(collectors.contains(&"exporter".to_string()));
            }
        }
    }
}
