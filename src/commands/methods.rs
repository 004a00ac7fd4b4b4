//! `methods`: list the provider's calculation methods.

use anyhow::Result;

use super::report_error;
use crate::config::SettingsStore;
use crate::provider::AladhanClient;
use crate::provider::aladhan::CalculationMethod;

/// One listing line, with a marker for the configured method.
pub fn method_line(method: &CalculationMethod, current_id: u32) -> String {
    let marker = if method.id == current_id { "*" } else { " " };
    format!("{marker} {:>2}  {}", method.id, method.name)
}

pub fn handle_methods_command() -> Result<()> {
    log_version!();

    let store = SettingsStore::load()?;
    let current = store.get().method_id;

    let methods = match AladhanClient::new().and_then(|client| client.fetch_methods()) {
        Ok(methods) => methods,
        Err(error) => {
            report_error(&error);
            log_end!();
            return Err(error.into());
        }
    };

    log_block_start!("Calculation methods");
    for method in &methods {
        log_indented!("{}", method_line(method, current));
    }
    if !methods.iter().any(|m| m.id == current) {
        log_pipe!();
        log_warning!("Configured method {} is not offered by the provider", current);
    }
    log_block_start!("Change with: qiyam set method <id>");
    log_end!();
    Ok(())
}
