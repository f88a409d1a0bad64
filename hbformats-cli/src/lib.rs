//! `hbformats` command line: decode one asset file and print it as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hbformats::{
    Action, BoneDatabase, JsonDump, ModuleTable, Motion, MotionDatabase, ObjectDatabase,
    ObjectSet, ReplayReader, SpriteDatabase, SpriteSet, TextureSet,
};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "hbformats")]
#[command(about = "Dump Project DIVA databases and Project Heartbeat replays as JSON")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Write the JSON here instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(short, long, global = true)]
    pub pretty: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Skeletons from bone_data.bin
    BoneDb { input: PathBuf },

    /// Motion sets from mot_db.bin
    MotionDb { input: PathBuf },

    /// Keyframes from a mot_*.bin file
    Motion { input: PathBuf },

    /// Sprite sets from spr_db.bin
    SpriteDb { input: PathBuf },

    /// Sprites and texture headers from a spr_*.bin file
    SpriteSet { input: PathBuf },

    /// Texture headers from a .txd/_tex.bin file
    Txp { input: PathBuf },

    /// Object sets from obj_db.bin
    ObjectDb { input: PathBuf },

    /// Models from an *_obj.bin file
    ObjectSet { input: PathBuf },

    /// Modules from gm_module_tbl.txt
    ModuleTable {
        input: PathBuf,

        /// spr_db.bin used to resolve select-screen sprites
        #[arg(long, env = "HBFORMATS_SPRITE_DB")]
        sprite_db: Option<PathBuf>,
    },

    /// Header, devices and events of a .phr replay
    Replay {
        input: PathBuf,

        /// First timestamp to include
        #[arg(long, allow_negative_numbers = true)]
        start: Option<i64>,

        /// Timestamp to stop before; defaults to the end of the replay
        #[arg(long, allow_negative_numbers = true)]
        end: Option<i64>,
    },
}

impl Commands {
    pub fn input(&self) -> &Path {
        match self {
            Self::BoneDb { input }
            | Self::MotionDb { input }
            | Self::Motion { input }
            | Self::SpriteDb { input }
            | Self::SpriteSet { input }
            | Self::Txp { input }
            | Self::ObjectDb { input }
            | Self::ObjectSet { input }
            | Self::ModuleTable { input, .. }
            | Self::Replay { input, .. } => input.as_path(),
        }
    }
}

/// Decodes the selected input and writes its JSON dump.
pub fn run(cli: &Cli) -> Result<()> {
    let json = render(&cli.command, cli.pretty)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!("wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Decodes the selected input and returns its JSON dump.
pub fn render(command: &Commands, pretty: bool) -> Result<String> {
    let input = command.input();
    tracing::info!("decoding {}", input.display());

    let json = match command {
        Commands::BoneDb { .. } => BoneDatabase::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::MotionDb { .. } => MotionDatabase::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::Motion { .. } => Motion::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::SpriteDb { .. } => SpriteDatabase::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::SpriteSet { .. } => SpriteSet::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::Txp { .. } => TextureSet::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::ObjectDb { .. } => ObjectDatabase::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::ObjectSet { .. } => ObjectSet::from_slice(&read(input)?)?.to_json(pretty)?,
        Commands::ModuleTable { sprite_db, .. } => {
            let sprite_db = match sprite_db {
                Some(path) => Some(SpriteDatabase::from_slice(&read(path)?)?),
                None => None,
            };
            let text = std::fs::read_to_string(input)
                .with_context(|| format!("reading {}", input.display()))?;
            ModuleTable::parse(&text, sprite_db.as_ref())?.to_json(pretty)?
        }
        Commands::Replay { start, end, .. } => {
            let reader = ReplayReader::try_from_buffer(&read(input)?)
                .with_context(|| format!("decoding replay {}", input.display()))?;
            replay_json(&reader, *start, *end, pretty)?
        }
    };
    Ok(json)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn replay_json(
    reader: &ReplayReader,
    start: Option<i64>,
    end: Option<i64>,
    pretty: bool,
) -> Result<String> {
    let start = start.unwrap_or(i64::MIN);
    let selected = match end {
        Some(end) => reader.events_in_interval(start, end)?,
        None => reader.events_from(start),
    };

    let events: Vec<_> = selected
        .into_iter()
        .map(|e| {
            let held: serde_json::Map<_, _> = Action::ALL
                .iter()
                .map(|&a| (format!("{a:?}"), json!(e.snapshot.action_held_count(a))))
                .collect();
            json!({
                "index": e.index,
                "event": e.event,
                "device_name": e.device_name(),
                "held": held,
            })
        })
        .collect();

    let value = json!({
        "version": reader.version(),
        "song_id": reader.song_id(),
        "song_difficulty": reader.song_difficulty(),
        "song_chart_hash": reader.song_chart_hash(),
        "devices": reader.devices(),
        "events": events,
    });
    let out = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(out)
}
