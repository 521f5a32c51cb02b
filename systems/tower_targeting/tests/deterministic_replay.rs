use std::{sync::Arc, time::Duration};

use siege_core::{
    standard_ids, Catalog, CellCoord, Command, EnemyId, Event, Intent, MapDefinition, PlayerId,
    SpawnEntry, TowerTarget, WaveDefinition, WaveIndex,
};
use siege_system_tower_targeting::TowerTargeting;
use siege_world::{self as world, query, World};

#[test]
fn deterministic_replay_prefers_the_leading_enemy() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");

    let targeted: Vec<EnemyId> = first
        .iter()
        .flat_map(|targets| targets.iter().map(|target| target.enemy))
        .collect();
    assert!(!targeted.is_empty(), "tower never acquired a target");
    assert!(
        targeted.iter().all(|enemy| *enemy == EnemyId::new(1)),
        "first-policy tower must track the enemy furthest along the path"
    );
}

fn replay(commands: Vec<Command>) -> Vec<Vec<TowerTarget>> {
    let catalog = Arc::new(Catalog::standard());
    let map = Arc::new(MapDefinition::meadow());
    let schedule = vec![WaveDefinition {
        entries: vec![
            SpawnEntry {
                enemy: standard_ids::BASIC_ENEMY,
                offset_secs: 0.0,
            },
            SpawnEntry {
                enemy: standard_ids::BASIC_ENEMY,
                offset_secs: 1.0,
            },
        ],
        bonus: 0,
    }];
    let mut world = World::new(catalog, map, schedule).expect("valid world");
    let mut targeting = TowerTargeting::new();
    let mut assignments = Vec::new();

    for command in commands {
        let mut events: Vec<Event> = Vec::new();
        world::apply(&mut world, command, &mut events);

        let mut targets = Vec::new();
        targeting.handle(&query::towers(&world), &query::enemies(&world), &mut targets);
        assignments.push(targets);
    }

    assignments
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::Submit {
            player: PlayerId::new(1),
            sequence: 1,
            intent: Intent::PlaceTower {
                kind: standard_ids::BASIC_TOWER,
                cell: CellCoord::new(2, 2),
            },
        },
        Command::BeginWave,
        Command::SpawnEnemy {
            wave: WaveIndex::new(0),
            kind: standard_ids::BASIC_ENEMY,
        },
    ];

    let first = EnemyId::new(1);
    for step in 1..=10 {
        commands.push(Command::MoveEnemy {
            enemy: first,
            progress: step as f32 * 6.0,
        });
    }
    commands.push(Command::SpawnEnemy {
        wave: WaveIndex::new(0),
        kind: standard_ids::BASIC_ENEMY,
    });
    for step in 11..=20 {
        commands.push(Command::MoveEnemy {
            enemy: first,
            progress: step as f32 * 6.0,
        });
        commands.push(Command::Tick {
            dt: Duration::from_millis(100),
        });
    }
    commands
}
