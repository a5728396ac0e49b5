//! Running queries of an instance (`pg_stat_activity`)

use crate::commands::db::{names, primary_instance};
use crate::commands::secrets::Secrets;
use crate::config::ClusterContext;
use crate::gcp::sql;
use anyhow::{Result, anyhow};

/// Activity query, collapsed onto one line so psql gets it in a single send
pub fn activity_query(verbose: bool) -> String {
    let mut query = String::from(
        "SELECT pid, state, application_name AS source, usename AS username, \
         age(now(),xact_start) AS running_for, xact_start AS transaction_start, query \
         FROM pg_stat_activity \
         WHERE query <> '<insufficient privilege>'",
    );
    if !verbose {
        query.push_str(" AND state <> 'idle'");
    }
    query.push_str(" AND pid <> pg_backend_pid() ORDER BY query_start DESC;");
    query
}

pub fn run(context: &ClusterContext, app: &str, instance: Option<&str>, include_idle: bool) -> Result<()> {
    sql::require_expect()?;
    let primary = primary_instance(context, app)?;
    let instance = instance
        .map(|name| names::instance_name(app, name))
        .unwrap_or_else(|| primary.clone());

    // Replicas share the users of their primary
    let key = names::root_password_key(&primary);
    let root_password = Secrets::new(app, context)
        .get(&key)?
        .ok_or_else(|| anyhow!("Missing {} in secrets of {}", key, app))?;

    let transcript = sql::query(&instance, &context.project, &root_password, &[&activity_query(include_idle)])?;
    print!("{}", transcript);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_query_hides_idle_by_default() {
        let query = activity_query(false);
        assert!(query.contains("AND state <> 'idle'"));
        assert!(!query.contains('\n'));
        assert!(query.ends_with("ORDER BY query_start DESC;"));
    }

    #[test]
    fn test_activity_query_verbose() {
        let query = activity_query(true);
        assert!(!query.contains("'idle'"));
        assert!(query.contains("FROM pg_stat_activity WHERE"));
    }
}
