//! Print the default entity catalogue, rule descriptors and admin roles as JSON.
//!
//! Usage: `emporium-fixtures [entities|rules|roles]` (everything by default).

use std::io::Write;

use anyhow::{Context, bail};
use serde_json::json;

use emporium_auth::fixtures::{default_entities, default_roles, default_rules};
use emporium_infra::Settings;

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env().context("loading settings")?;
    emporium_observability::tracing::init(&settings.tracing);

    let section = std::env::args().nth(1);
    let document = match section.as_deref() {
        None | Some("all") => json!({
            "entities": default_entities(),
            "rules": default_rules(),
            "roles": default_roles(),
        }),
        Some("entities") => serde_json::to_value(default_entities())?,
        Some("rules") => serde_json::to_value(default_rules())?,
        Some("roles") => serde_json::to_value(default_roles())?,
        Some(other) => bail!("unknown section '{other}' (expected entities, rules or roles)"),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &document).context("writing fixtures")?;
    writeln!(out)?;

    tracing::info!(section = section.as_deref().unwrap_or("all"), "fixtures exported");
    Ok(())
}
