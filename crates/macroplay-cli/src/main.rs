use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use macroplay_core::ActionType;
use macroplay_core::config::{ConfigLoadError, MacroplayConfig};
use macroplay_events::display_name;
use macroplay_host::{PlayOutcome, Player, SceneHost, SceneState};
use macroplay_runner::{
    DriverOptions, init_logging, load_library, load_scene, run_until_idle, save_library,
    setup_render_complete_signal,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play an action against an in-memory scene
    Play {
        /// Action library JSON file
        #[arg(short, long)]
        library: PathBuf,

        /// Action id or label
        #[arg(short, long)]
        action: String,

        /// Look the action up among the local actions
        #[arg(long)]
        local: bool,

        /// Scene JSON file; an empty scene with one 3D viewport otherwise
        #[arg(short, long)]
        scene: Option<PathBuf>,

        /// Report a finished render this many milliseconds after playback starts waiting
        #[arg(long, value_name = "MS")]
        render_complete_after: Option<u64>,

        /// Stop waiting for scheduled macros after this many seconds
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,

        /// Write alert flags back to the library file
        #[arg(long)]
        save_alerts: bool,
    },

    /// List the macros of every action in a library
    Inspect {
        #[arg(short, long)]
        library: PathBuf,
    },

    /// Show where each category of a library is visible
    Visibility {
        #[arg(short, long)]
        library: PathBuf,
    },

    /// Write an example config file
    InitConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<MacroplayConfig> {
    let path = path.cloned().unwrap_or_else(MacroplayConfig::config_path);
    match MacroplayConfig::load_from(&path) {
        Ok(config) => Ok(config),
        Err(ConfigLoadError::NotFound) => Ok(MacroplayConfig::default()),
        Err(err) => Err(anyhow!("Failed to load config {}: {}", path.display(), err)),
    }
}

#[allow(clippy::too_many_arguments)]
async fn play(
    config: &MacroplayConfig,
    library_path: PathBuf,
    action: String,
    local: bool,
    scene: Option<PathBuf>,
    render_complete_after: Option<u64>,
    timeout: Option<u64>,
    save_alerts: bool,
) -> anyhow::Result<()> {
    let mut library = load_library(&library_path)?;
    let state = match scene {
        Some(path) => load_scene(&path)?,
        None => SceneState::default(),
    };
    let mut host = SceneHost::new(state);

    let action_type = if local {
        ActionType::Local
    } else {
        ActionType::Global
    };
    let action_id = library
        .find_action(action_type, &action)
        .map(|a| a.id.clone())
        .with_context(|| format!("No {} action named {}", action_type, action))?;

    let mut player = Player::new(config.player.clone());
    let outcome = player.play(&mut host, &mut library, action_type, &action_id);

    let failed = match outcome {
        Ok(PlayOutcome::Finished) => {
            info!("Playback finished");
            false
        }
        Ok(PlayOutcome::Suspended) => {
            info!("Playback suspended, waiting for scheduled macros");
            let options = DriverOptions {
                tick_interval: config.player.tick_interval(),
                render_complete_after: render_complete_after.map(Duration::from_millis),
                timeout: timeout.map(Duration::from_secs),
            };
            let render_signal = Some(setup_render_complete_signal());
            let summary =
                run_until_idle(&mut player, &mut host, &mut library, &options, render_signal).await;
            info!(
                "Driver finished after {} ticks: {} resumed, {} skipped, {} renders",
                summary.ticks, summary.resumed, summary.skipped, summary.renders_signalled
            );
            for (action_id, err) in &summary.failures {
                error!("Action {} failed: {}", action_id, err);
            }
            if summary.waiting_for_render > 0 {
                warn!("{} action(s) still wait for a render", summary.waiting_for_render);
            }
            !summary.failures.is_empty() || summary.timed_out
        }
        Err(err) => {
            error!("Playback failed: {}", err);
            true
        }
    };

    for entry in host.journal() {
        println!("{}", entry.command);
    }

    if save_alerts {
        save_library(&library, &library_path)?;
    }
    if failed {
        bail!("Playback of {} did not complete", action);
    }
    Ok(())
}

fn inspect(library_path: PathBuf) -> anyhow::Result<()> {
    let library = load_library(&library_path)?;
    for action_type in [ActionType::Global, ActionType::Local] {
        for action in library.actions(action_type) {
            let alert = if action.alert { " [alert]" } else { "" };
            println!(
                "{} {} ({}, {:?}){}",
                action_type, action.label, action.id, action.execution_mode, alert
            );
            for (index, m) in action.macros.iter().enumerate() {
                let kind = m
                    .parse()
                    .map(|command| command.kind().to_string())
                    .unwrap_or_else(|_| "malformed".to_string());
                let name = display_name(&m.command).unwrap_or_else(|| m.label.clone());
                let active = if m.active { ' ' } else { '-' };
                println!("  {:>3}{} [{}] {}", index, active, kind, name);
            }
        }
    }
    Ok(())
}

fn visibility(library_path: PathBuf) -> anyhow::Result<()> {
    let library = load_library(&library_path)?;
    for category in &library.categories {
        println!("{} ({})", category.label, category.id);
        for entry in category.visibility() {
            println!("  {} / {}", entry.area_type, entry.mode);
        }
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(MacroplayConfig::config_path);
    if MacroplayConfig::write_example(&path)? {
        eprintln!("Config file created at: {}", path.display());
    } else {
        eprintln!(
            "Config file already exists at {}. Edit it manually or delete it to create a new one.",
            path.display()
        );
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig = cli.command {
        return init_config(cli.config);
    }

    let config = load_config(cli.config.as_ref())?;
    let _guard = init_logging("cli", &config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Command::Play {
            library,
            action,
            local,
            scene,
            render_complete_after,
            timeout,
            save_alerts,
        } => {
            play(
                &config,
                library,
                action,
                local,
                scene,
                render_complete_after,
                timeout,
                save_alerts,
            )
            .await
        }
        Command::Inspect { library } => inspect(library),
        Command::Visibility { library } => visibility(library),
        Command::InitConfig => Ok(()),
    }
}
