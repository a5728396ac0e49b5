//! pgbouncer manifests fronting each Cloud SQL instance

use crate::commands::db::names;
use crate::config::ClusterContext;
use crate::gcp::sql;
use crate::utils::dryrun::{exec_unless_dry_run, exec_unless_dry_run_with_default};
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::PathBuf;

/// Values substituted into the manifest
#[derive(Debug, Clone)]
pub struct PgbouncerManifest<'a> {
    pub app: &'a str,
    pub instance: &'a str,
    pub image: &'a str,
    pub private_ip: &'a str,
}

impl PgbouncerManifest<'_> {
    pub fn render(&self) -> String {
        let app = self.app;
        let name = self.instance;
        let tier = names::pgbouncer_tier(app, name);
        let deployment = names::pgbouncer_deployment_name(name);
        let secret = names::pgbouncer_secret_name(name);
        let service = names::pgbouncer_service_name(name);
        let image = self.image;
        let private_ip = self.private_ip;

        format!(
            r#"---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: {deployment}
  namespace: {app}
  labels:
    app: {app}
    tier: {tier}
    database: {name}
spec:
  replicas: 2
  selector:
    matchLabels:
      app: {app}
      tier: {tier}
      database: {name}
  strategy:
    type: RollingUpdate
    rollingUpdate:
      maxSurge: 1
      maxUnavailable: 1
  template:
    metadata:
      labels:
        app: {app}
        tier: {tier}
        database: {name}
    spec:
      containers:
        - image: {image}
          name: pgbouncer
          ports:
            - containerPort: 6432
              protocol: TCP
          envFrom:
            - secretRef:
                name: {secret}
          env:
            - name: "PGPORT"
              value: "6432"
            - name: "PGDATABASE"
              value: "{name}"
            - name: "DB_HOST"
              value: "{private_ip}" # private IP for {name}
            - name: "DB_PORT"
              value: "5432"
            - name: "LISTEN_PORT"
              value: "6432"
            - name: "LISTEN_ADDRESS"
              value: "*"
            - name: "TCP_KEEPALIVE"
              value: "1"
            - name: "TCP_KEEPCNT"
              value: "5"
            - name: "TCP_KEEPIDLE"
              value: "300"
            - name: "TCP_KEEPINTVL"
              value: "300"
            - name: "LOG_DISCONNECTIONS"
              value: "0"
            - name: "MAX_CLIENT_CONN"
              value: "1000"
            - name: "MIN_POOL_SIZE"
              value: "20"
            - name: "DEFAULT_POOL_SIZE"
              value: "20"
            - name: "MAX_DB_CONNECTIONS"
              value: "20"
            - name: "POOL_MODE"
              value: "transaction"
          readinessProbe:
            exec:
              command: ["psql", "-c", "SELECT 1;"]
            initialDelaySeconds: 5
            periodSeconds: 10
          livenessProbe:
            tcpSocket:
              port: 6432
            initialDelaySeconds: 15
            periodSeconds: 20
          resources:
            requests:
              cpu: 100m
              memory: 300Mi
          lifecycle:
            preStop:
              exec:
                command: ["/bin/sh", "-c", "killall -INT pgbouncer && sleep 20"]
---
apiVersion: v1
kind: Service
metadata:
  name: {service}
  namespace: {app}
  labels:
    app: {app}
    tier: {tier}
spec:
  type: ClusterIP
  ports:
    - protocol: TCP
      port: 6432
      targetPort: 6432
  selector:
    app: {app}
    tier: {tier}
    database: {name}
"#
        )
    }
}

/// `kubernetes/<cluster>/<app>/pgbouncer-<suffix>.yaml`
pub fn manifest_path(cluster: &str, app: &str, instance: &str) -> PathBuf {
    PathBuf::from("kubernetes")
        .join(cluster)
        .join(app)
        .join(format!("pgbouncer-{}.yaml", names::pgbouncer_tier(app, instance)))
}

/// Look up the instance's private IP and (re)write its manifest
pub fn write_pgbouncer_yaml(context: &ClusterContext, app: &str, instance: &str) -> Result<PathBuf> {
    let private_ip = exec_unless_dry_run_with_default(
        &format!("look up private IP of {}", instance),
        "<private-ip>".to_string(),
        || {
            sql::describe_instance(instance, &context.project)?
                .private_ip()
                .map(str::to_string)
                .ok_or_else(|| anyhow!("Instance {} has no private IP address", instance))
        },
    )?;

    let manifest = PgbouncerManifest {
        app,
        instance,
        image: &context.settings.database.pgbouncer_image,
        private_ip: &private_ip,
    };
    let path = manifest_path(&context.cluster, app, instance);

    exec_unless_dry_run(&format!("write {}", path.display()), || {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, manifest.render())
            .with_context(|| format!("Failed to write {}", path.display()))
    })?;

    crate::log_info!("Wrote pgbouncer manifest to {}", path.display());
    Ok(path)
}
