//! Repair Search CLI - Search for repairs described by a JSON problem file.

use std::path::PathBuf;

use serde_json::json;

use repair_search::{
    LocalProblem, LocalProvider, RandomSearch, StopReason,
    engine::Problem,
    schema::{EditKind, ExpectedOutcome, LineEdit, ProblemConfig, SearchConfig, TestConfig},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <problem.json> [threads]", args[0]);
        eprintln!();
        eprintln!("Search for a patch that makes every test of a program pass.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  problem.json  Path to problem description file");
        eprintln!("  threads       Number of workers (overrides the problem file)");
        eprintln!();
        eprintln!("Example problem file is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_problem();
        return;
    }

    let problem_path = PathBuf::from(&args[1]);

    let problem = LocalProblem::load(&problem_path).unwrap_or_else(|e| {
        eprintln!("Error loading problem: {}", e);
        std::process::exit(1);
    });

    let mut config = problem.search_config().clone();
    if let Some(threads) = args.get(2) {
        config.threads = threads.parse().unwrap_or_else(|e| {
            eprintln!("Error parsing thread count {:?}: {}", threads, e);
            std::process::exit(1);
        });
    }

    println!("Repair Search");
    println!("=============");
    println!("Source: {}", problem.source_directory().display());
    println!("Build steps: {}", problem.build_instructions().len());
    println!("Tests: {}", problem.tests().len());
    println!("Transformations: {}", problem.transformations().len());
    println!("Threads: {}", config.threads);
    println!("Terminate early: {}", config.terminate_early);
    match config.time_limit {
        Some(limit) => println!("Time limit: {}s", limit),
        None => println!("Time limit: none"),
    }
    println!();

    let search = RandomSearch::from_config(LocalProvider::new(), problem, &config)
        .unwrap_or_else(|e| {
            eprintln!("Invalid search configuration: {}", e);
            std::process::exit(1);
        });

    println!("Searching...");
    let report = search.run(config.seed).unwrap_or_else(|e| {
        eprintln!("Error running search: {}", e);
        std::process::exit(1);
    });

    println!();
    for (i, repair) in report.repairs.iter().enumerate() {
        println!(
            "Repair {} (found after {:.1}s): {}",
            i + 1,
            repair.found_after.as_secs_f64(),
            repair.candidate
        );
        println!("{}", repair.patch);
    }

    let stats = &report.stats;
    println!("Stopped: {}", report.stop_reason);
    println!("Repairs: {}", report.repairs.len());
    println!(
        "Candidates: {} ({} tests executed)",
        stats.candidates_evaluated, stats.tests_executed
    );
    println!(
        "Time: {:.2}s ({:.2} candidates/s)",
        stats.elapsed_seconds, stats.candidates_per_second
    );

    if let StopReason::Error(_) = report.stop_reason {
        std::process::exit(1);
    }
}

fn print_example_problem() {
    let problem = ProblemConfig {
        source_directory: PathBuf::from("program"),
        build_instructions: json!({
            "steps": ["make clean", { "command": "make", "directory": "src" }],
            "steps-for-coverage": ["make clean", "make CFLAGS=--coverage"],
            "time-limit": 120
        }),
        tests: vec![
            TestConfig {
                name: "p1".into(),
                command: "./run-test.sh p1".into(),
                directory: None,
                time_limit: Some(10),
                outcome: ExpectedOutcome::Passing,
                cost: Some(0.4),
            },
            TestConfig {
                name: "n1".into(),
                command: "./run-test.sh n1".into(),
                directory: None,
                time_limit: Some(10),
                outcome: ExpectedOutcome::Failing,
                cost: Some(1.2),
            },
        ],
        transformations: vec![
            LineEdit {
                file: "src/main.c".into(),
                line: 12,
                kind: EditKind::Delete,
            },
            LineEdit {
                file: "src/main.c".into(),
                line: 12,
                kind: EditKind::Replace {
                    text: "    if (n > 0) {".into(),
                },
            },
            LineEdit {
                file: "src/main.c".into(),
                line: 20,
                kind: EditKind::Append {
                    text: "    return 0;".into(),
                },
            },
        ],
        search: SearchConfig {
            threads: 4,
            terminate_early: true,
            time_limit: Some(3600),
            seed: Some(0),
        },
    };

    println!("Example problem (problem.json):");
    match serde_json::to_string_pretty(&problem) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
