//! Terminal rendition of the scenario screens.

use drive_core::model::{CategoryId, OptionKey, PhaseId};
use services::{
    AppServices, CompletedSession, Mount, Route, ScenarioScreen, SessionCompletion,
    SessionTracker,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>, std::io::Error> {
    println!("{text}");
    Ok(input.next_line().await?.map(|line| line.trim().to_owned()))
}

pub async fn run(
    services: &AppServices,
    category: CategoryId,
    phase: PhaseId,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut tracker = services.tracker()?;
    let mut next = Some((category, phase));

    while let Some((category, phase)) = next.take() {
        let session = tracker.start_session(category, phase, "")?;
        let count = session.scenario_count();
        println!(
            "\n== {} · phase {} ({} scenarios) ==",
            session.category_name(),
            phase,
            count
        );
        announce_listing(services, category, phase, count).await?;

        match play_phase(services, &mut tracker, &mut input).await? {
            None => break,
            Some(Route::PhaseStart { category, phase }) => {
                let question = format!("Continue to category {category}, phase {phase}? [y/N]");
                let answer = prompt(&mut input, &question).await?;
                if answer.is_some_and(|a| a.eq_ignore_ascii_case("y")) {
                    next = Some((category, phase));
                }
            }
            Some(Route::Results) => println!("\nCurriculum finished."),
            Some(Route::Login) => {
                println!("Not logged in. Run `drive login --token <token>` first.");
            }
            Some(Route::Scenario { .. }) => {}
        }
    }

    tracker.dispose();
    Ok(())
}

/// Lists the phase up front so a missing or partial backend shows before the first answer.
async fn announce_listing(
    services: &AppServices,
    category: CategoryId,
    phase: PhaseId,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let listed = services
        .catalog()
        .phase_scenarios(category, phase, count)
        .await?
        .len();
    if listed == count {
        return Ok(());
    }
    tracing::warn!(%category, %phase, listed, expected = count, "phase listing is short");
    if listed == 0 {
        println!("The server lists no scenarios for this phase; answers will be kept locally.");
    } else {
        println!("The server lists only {listed} of {count} scenarios for this phase.");
    }
    Ok(())
}

/// Plays screens until the phase routes elsewhere. `None` when input ends.
async fn play_phase(
    services: &AppServices,
    tracker: &mut SessionTracker,
    input: &mut Input,
) -> Result<Option<Route>, Box<dyn std::error::Error>> {
    loop {
        let mut screen =
            match ScenarioScreen::mount(tracker, services.auth(), services.catalog()).await? {
                Mount::Ready(screen) => screen,
                Mount::Redirect(route) => return Ok(Some(route)),
            };

        println!("\n[{:?}]", screen.intro());
        screen.finish_intro()?;
        println!("{}", screen.question());
        if screen.is_degraded() {
            println!("This scenario could not be loaded. Check the backend and try again.");
            return Ok(None);
        }
        for choice in screen.choices() {
            println!("  {}) {}", choice.option, choice.text);
        }

        let evaluation = loop {
            let Some(raw) = prompt(input, "Your answer:").await? else {
                return Ok(None);
            };
            let Ok(option) = OptionKey::parse(&raw) else {
                continue;
            };
            if screen.descriptor().choice(&option).is_none() {
                println!("Pick one of the listed options.");
                continue;
            }
            break screen.select(tracker, &option).await?;
        };

        let verdict = if evaluation.is_correct {
            "Correct!"
        } else {
            "Not quite."
        };
        println!("[{:?}] {verdict}", evaluation.animation);
        if !evaluation.explanation.is_empty() {
            println!("{}", evaluation.explanation);
        }
        if screen
            .record()
            .is_some_and(|record| !record.submission().is_accepted())
        {
            println!("(answer saved locally; it could not be sent to the server)");
        }

        match screen.next(tracker).await? {
            Route::Scenario { .. } => {}
            route => {
                if let Some(SessionCompletion::Complete(done)) = screen.completion() {
                    print_summary(done);
                }
                return Ok(Some(route));
            }
        }
    }
}

fn print_summary(done: &CompletedSession) {
    let summary = &done.summary;
    println!(
        "\nPhase complete: {}/{} correct.",
        summary.score(),
        summary.total()
    );
    if !summary.is_fully_synced() {
        println!(
            "{} answer(s) could not be sent to the server and are kept locally.",
            summary.unsynced_count()
        );
    }
}
