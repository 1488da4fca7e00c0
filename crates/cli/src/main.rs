use std::path::PathBuf;
use std::sync::Arc;

use clap::{
  Parser,
  Subcommand
};
use portal_core::app::guardian::Guardian;
use portal_core::infra::sqlite_probe::SqliteProbe;
use portal_core::infra::system_clock::SystemClock;
use portal_server::config::ServerConfig;
use portal_server::{
  db,
  schema
};

#[derive(Parser)]
#[command(
  author,
  version,
  about = "campus portal ops CLI"
)]

struct Args {
  #[command(subcommand)]
  command: Command
}

#[derive(Subcommand)]

enum Command {
  /// Validate server config (schema +
  /// semantic checks).
  Validate {
    /// Path to config.toml (defaults
    /// to SERVER_CONFIG_PATH or
    /// crates/server/res/config.toml).
    config_path: Option<PathBuf>
  },
  /// Apply the schema, then create the
  /// default admin and demo accounts.
  Seed {
    config_path: Option<PathBuf>,
    /// Skip the demo faculty, student
    /// and parent accounts.
    #[arg(long)]
    admin_only:  bool,
    /// Also replace departments,
    /// subjects and timetables with the
    /// stock catalogue.
    #[arg(long)]
    academics:   bool
  },
  /// Run one storage health check and
  /// print the report as JSON.
  Guardian {
    config_path: Option<PathBuf>
  },
  /// Remove the local SQLite database
  /// with a safety flag.
  Clean {
    config_path: Option<PathBuf>,
    /// Required to perform destructive
    /// actions.
    #[arg(long)]
    confirm:     bool
  }
}

#[tokio::main]

async fn main() -> Result<(), String> {
  let args = Args::parse();

  match args.command {
    | Command::Validate {
      config_path
    } => {
      let cfg_path =
        pick_config_path(config_path);

      ServerConfig::load(&cfg_path)
        .await
        .map_err(|e| e.to_string())?;

      println!(
        "ok: config validated at {}",
        cfg_path.display()
      );
    }
    | Command::Seed {
      config_path,
      admin_only,
      academics
    } => {
      let cfg_path =
        pick_config_path(config_path);
      let config =
        ServerConfig::load(&cfg_path)
          .await
          .map_err(|e| e.to_string())?;

      let pool =
        db::connect_db(&config, &cfg_path)
          .await
          .map_err(|e| e.to_string())?;
      schema::apply_server_schema(
        &pool, &cfg_path
      )
      .await
      .map_err(|e| e.to_string())?;

      db::ensure_default_admin(
        &config, &pool
      )
      .await
      .map_err(|e| e.to_string())?;

      let demo = if admin_only {
        0
      } else {
        db::seed_demo_users(&config, &pool)
          .await
          .map_err(|e| e.to_string())?
      };

      println!(
        "ok: seeded admin {} and {demo} \
         demo account(s)",
        config.seed.admin_email
      );

      if academics {
        let seeded =
          db::seed_academics(&pool)
            .await
            .map_err(|e| e.to_string())?;

        println!(
          "ok: seeded {} departments, {} \
           subjects, {} timetables",
          seeded.departments,
          seeded.subjects,
          seeded.timetables
        );
      }
    }
    | Command::Guardian {
      config_path
    } => {
      let cfg_path =
        pick_config_path(config_path);
      let config =
        ServerConfig::load(&cfg_path)
          .await
          .map_err(|e| e.to_string())?;

      let pool =
        db::connect_db(&config, &cfg_path)
          .await
          .map_err(|e| e.to_string())?;

      let guardian = Guardian::new(
        config.guardian_policy(),
        Arc::new(SqliteProbe::new(pool)),
        Arc::new(SystemClock)
      );
      let report =
        guardian.run_health_check().await;

      let json =
        serde_json::to_string_pretty(
          &report
        )
        .map_err(|e| e.to_string())?;
      println!("{json}");
    }
    | Command::Clean {
      config_path,
      confirm
    } => {
      if !confirm {
        return Err(
          "refusing to clean without \
           --confirm"
            .to_string()
        );
      }

      let cfg_path =
        pick_config_path(config_path);
      let config =
        ServerConfig::load(&cfg_path)
          .await
          .map_err(|e| e.to_string())?;

      let base_dir = cfg_path
        .parent()
        .ok_or_else(|| {
          "config path has no parent"
            .to_string()
        })?;
      let db_path =
        config.sqlite_path(base_dir);

      // WAL mode leaves sidecar files.
      for suffix in ["", "-wal", "-shm"] {
        let mut target =
          db_path.clone().into_os_string();
        target.push(suffix);

        if let Err(e) =
          std::fs::remove_file(&target)
        {
          if e.kind()
            != std::io::ErrorKind::NotFound
          {
            return Err(format!(
              "failed to remove {}: {e}",
              PathBuf::from(target).display()
            ));
          }
        }
      }

      println!(
        "ok: removed {}",
        db_path.display()
      );
    }
  }

  Ok(())
}

fn pick_config_path(
  arg: Option<PathBuf>
) -> PathBuf {
  if let Some(p) = arg {
    return p;
  }

  // CLI flags win; fall back to
  // SERVER_CONFIG_PATH, then the
  // repo-local default.
  if let Ok(p) =
    std::env::var("SERVER_CONFIG_PATH")
  {
    if !p.trim().is_empty() {
      return PathBuf::from(p);
    }
  }

  PathBuf::from(
    "crates/server/res/config.toml"
  )
}
