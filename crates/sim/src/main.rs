//! Buff simulation binary.
//!
//! Loads a buff catalog (from `BUFF_DATA_DIR` or the built-in one), applies a
//! scripted set of buffs to two units, lets the goblin strike the hero every
//! tick and prints the hero's effective stats after every tick.
//!
//! # Environment
//!
//! - `BUFF_DATA_DIR`: data directory with `buffs.ron`/`buffs.toml`
//! - `BUFF_SIM_STEPS`: number of ticks (default 12)
//! - `BUFF_SIM_DT`: seconds per tick (default 1.0)
//! - `RUST_LOG`: log filter (default `info`)

mod config;
mod unit;

use anyhow::{Context, Result};
use buff_content::ContentFactory;
use buff_core::{
    ApplyOptions, BuffEngine, BuffEvent, BuffKind, BuffTarget, CommandQueue, DefinitionRegistry,
    EngineConfig,
};

use crate::config::SimConfig;
use crate::unit::Unit;

const HERO: usize = 0;
const GOBLIN: usize = 1;
const STATS: [&str; 5] = ["hp", "attack", "speed", "armor", "shield"];

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SimConfig::from_env();
    tracing::info!(?config, "starting buff simulation");

    let (registry, engine_config) = load_content(&config)?;
    let mut engine = BuffEngine::with_config(registry, engine_config);
    engine.add_listener(|event: &BuffEvent, commands: &mut CommandQueue| {
        if let BuffEvent::Expired(instance) = event {
            if instance.definition_id() == "haste" {
                commands.apply("regeneration", instance.target(), ApplyOptions::default());
            }
        }
    });

    let mut world = vec![
        Unit::new(1, "hero")
            .stat("hp", 60.0)
            .stat("attack", 100.0)
            .stat("speed", 100.0)
            .stat("armor", 10.0),
        Unit::new(2, "goblin")
            .stat("hp", 30.0)
            .stat("attack", 40.0)
            .stat("speed", 120.0),
    ];

    opening_moves(&mut engine, &mut world)?;
    print_header();
    print_row(&engine, &world[HERO], 0);

    for step in 1..=config.steps {
        engine.tick(config.delta, &mut world);
        goblin_strikes(&engine, &mut world);

        if world[HERO].property("hp") <= 0.0 {
            engine.notify_condition(&mut world[HERO], "near_death");
        }
        if step == 4 {
            let dispelled = engine.dispel(&mut world[HERO], BuffKind::Debuff);
            tracing::info!(dispelled, "cleanse");
        }

        print_row(&engine, &world[HERO], step);
    }

    tracing::info!(
        elapsed = engine.elapsed(),
        remaining = engine.instance_count(),
        "simulation finished"
    );
    Ok(())
}

fn load_content(config: &SimConfig) -> Result<(DefinitionRegistry, EngineConfig)> {
    let (registry, report, engine_config) = match &config.data_dir {
        Some(dir) => {
            let factory = ContentFactory::new(dir);
            let (registry, report) = factory
                .load_catalog()
                .with_context(|| format!("loading catalog from {}", dir.display()))?;
            (registry, report, factory.load_config()?)
        }
        None => {
            let (registry, report) = buff_content::builtin_registry()?;
            (registry, report, buff_content::builtin_config()?)
        }
    };

    for (key, error) in &report.skipped {
        tracing::warn!(%key, %error, "definition skipped");
    }
    tracing::info!(definitions = registry.len(), "catalog ready");
    Ok((registry, engine_config))
}

/// Buffs applied before the first tick.
fn opening_moves(engine: &mut BuffEngine, world: &mut [Unit]) -> Result<()> {
    let goblin = world[GOBLIN].id;
    let hero = &mut world[HERO];

    for _ in 0..3 {
        engine.apply_buff("battle_fury", hero, ApplyOptions::default())?;
    }
    for id in ["haste", "stone_skin", "last_stand"] {
        engine.apply_buff(id, hero, ApplyOptions::default())?;
    }

    let venom = ApplyOptions::new().from_source(goblin).with_potency(1.5);
    for _ in 0..2 {
        let outcome = engine.apply_buff("poison", hero, venom.clone())?;
        tracing::debug!(?outcome, "goblin strikes");
    }
    Ok(())
}

/// Goblin hits the hero for its attack past the hero's armor.
fn goblin_strikes(engine: &BuffEngine, world: &mut [Unit]) {
    if !world[GOBLIN].is_alive() {
        return;
    }
    let attack = engine.calculate(&world[GOBLIN], "attack");
    let armor = engine.calculate(&world[HERO], "armor");
    let damage = (attack - armor).max(1.0);

    let hero = &mut world[HERO];
    let hp = hero.property("hp") - damage;
    hero.set_property("hp", hp);
    tracing::debug!(damage, hp, "goblin hits hero");
}

fn print_header() {
    print!("{:>5}", "step");
    for stat in STATS {
        print!(" {stat:>8}");
    }
    println!("  buffs");
}

fn print_row(engine: &BuffEngine, unit: &Unit, step: u32) {
    print!("{step:>5}");
    for stat in STATS {
        print!(" {:>8.1}", engine.calculate(unit, stat));
    }
    let buffs: Vec<String> = engine
        .active_buffs(unit.id)
        .iter()
        .map(|buff| match buff.stack() {
            1 => buff.definition_id().to_string(),
            n => format!("{}x{n}", buff.definition_id()),
        })
        .collect();
    println!("  {}", buffs.join(", "));
}
