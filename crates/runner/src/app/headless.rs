use std::io::Write;

use city_engine::program::Inventory;
use city_engine::{City, Console, ConsoleBuffer, Heading, ItemKind, LogRecord, SimulationState};
use serde::Serialize;
use tracing::warn;

/// Console that echoes every record to a writer and keeps a bounded history.
pub(crate) struct PrintingConsole<W: Write> {
    out: W,
    history: ConsoleBuffer,
    write_failed: bool,
}

impl<W: Write> PrintingConsole<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            history: ConsoleBuffer::default(),
            write_failed: false,
        }
    }

    pub(crate) fn history(&self) -> &ConsoleBuffer {
        &self.history
    }

    fn echo(&mut self, records: &[LogRecord]) {
        for record in records {
            if let Err(error) = writeln!(self.out, "{record}") {
                if !self.write_failed {
                    warn!(error = %error, "console_write_failed");
                    self.write_failed = true;
                }
                return;
            }
        }
    }
}

impl<W: Write> Console for PrintingConsole<W> {
    fn set(&mut self, records: &[LogRecord]) {
        self.history.set(records);
        self.echo(records);
    }

    fn add(&mut self, records: &[LogRecord]) {
        self.history.add(records);
        self.echo(records);
    }

    fn latest(&self) -> Option<&LogRecord> {
        self.history.last()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RobotSummary {
    identifier: String,
    x: i32,
    y: i32,
    heading: Heading,
    inventory: Inventory,
    active: bool,
    steps: u64,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemTotals {
    flower: u32,
    paper: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct RunSummary {
    pub(crate) state: SimulationState,
    pub(crate) ticks: u64,
    pub(crate) tick_limit_reached: bool,
    fingerprint: Option<String>,
    robots: Vec<RobotSummary>,
    items: ItemTotals,
    console: Vec<LogRecord>,
}

/// Starts the city and ticks it until every robot stops or `max_ticks` running ticks pass.
pub(crate) fn run_headless<W: Write>(
    city: &mut City<PrintingConsole<W>>,
    max_ticks: u64,
) -> RunSummary {
    city.start();
    while city.state() == SimulationState::Running && city.ticks() < max_ticks {
        city.tick();
    }
    let tick_limit_reached = city.state() == SimulationState::Running;
    if tick_limit_reached {
        warn!(
            max_ticks,
            active = city.map().active_instances(),
            "tick_limit_reached"
        );
    }
    summarize(city, tick_limit_reached)
}

fn summarize<W: Write>(city: &City<PrintingConsole<W>>, tick_limit_reached: bool) -> RunSummary {
    let map = city.map();
    RunSummary {
        state: city.state(),
        ticks: city.ticks(),
        tick_limit_reached,
        fingerprint: city.fingerprint().map(|fingerprint| fingerprint.to_hex()),
        robots: map
            .robots()
            .iter()
            .map(|robot| {
                let (x, y) = robot.position();
                RobotSummary {
                    identifier: robot.identifier().to_string(),
                    x,
                    y,
                    heading: robot.heading(),
                    inventory: robot.inventory(),
                    active: robot.is_active(),
                    steps: robot.steps(),
                    error: robot.last_error().map(ToString::to_string),
                }
            })
            .collect(),
        items: ItemTotals {
            flower: map.items().total(ItemKind::Flower),
            paper: map.items().total(ItemKind::Paper),
        },
        console: city.console().history().records().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_engine::program::{InitialPosition, InstanceDecl, RobotType, Statement};
    use city_engine::{CityConfig, Program, StaticProgram};

    fn city_with(body: Vec<Statement>) -> City<PrintingConsole<Vec<u8>>> {
        let mut program = Program::default();
        program.robot_types.push(RobotType {
            identifier: "t".to_string(),
            local_variables: Vec::new(),
            body,
        });
        program.instances.push(InstanceDecl {
            identifier: "r1".to_string(),
            type_name: "t".to_string(),
        });
        program.inits.initial_positions.push(InitialPosition {
            identifier: "r1".to_string(),
            x: 1,
            y: 1,
        });
        City::new(
            Box::new(StaticProgram::new(program)),
            PrintingConsole::new(Vec::new()),
            CityConfig::default(),
        )
    }

    #[test]
    fn console_echoes_records_and_keeps_history() {
        let mut console = PrintingConsole::new(Vec::new());
        console.set(&[LogRecord::valid("Comenzando ejecucion")]);
        console.add(&[LogRecord::info("r1: 2")]);

        let printed = String::from_utf8(console.out.clone()).expect("utf8");
        assert_eq!(printed, "[valid] Comenzando ejecucion\n[info] r1: 2\n");
        assert_eq!(console.latest(), Some(&LogRecord::info("r1: 2")));
        assert_eq!(console.history().len(), 2);
    }

    #[test]
    fn headless_run_summarizes_finished_city() {
        let mut city = city_with(vec![Statement::TakeFlower, Statement::TurnRight]);

        let summary = run_headless(&mut city, 100);

        assert_eq!(summary.state, SimulationState::Finished);
        assert_eq!(summary.ticks, 2);
        assert!(!summary.tick_limit_reached);
        assert_eq!(summary.items.flower, 30);
        let json = serde_json::to_value(&summary).expect("summary serializes");
        assert_eq!(json["robots"][0]["heading"], "east");
        assert_eq!(json["robots"][0]["inventory"]["flower"], 1);
        assert_eq!(json["state"], "finished");
    }

    #[test]
    fn headless_run_stops_at_tick_limit() {
        let looping = Statement::While {
            condition: city_engine::program::Expression::boolean(true),
            body: vec![Statement::TurnRight],
        };
        let mut city = city_with(vec![looping]);

        let summary = run_headless(&mut city, 25);

        assert_eq!(summary.state, SimulationState::Running);
        assert_eq!(summary.ticks, 25);
        assert!(summary.tick_limit_reached);
    }
}
