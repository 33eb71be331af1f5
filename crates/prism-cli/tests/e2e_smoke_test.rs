use std::{fs, path::PathBuf};

use tempfile::tempdir;

use prism_cli::{Args, CliError, Depth, infer_format, run};

/// Collects every shader file Prism recognizes in a directory
fn collect_shader_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && infer_format(path).is_some())
            .collect()
    } else {
        Vec::new()
    };

    // Sort for consistent test output
    files.sort();
    files
}

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn args_for(files: Vec<String>) -> Args {
    Args {
        files,
        format: None,
        json: true,
        strict: false,
        no_warnings: false,
        depth: Depth::Full,
        version_override: None,
        config: None,
        log_level: "off".to_string(),
    }
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let valid_demos = collect_shader_files(demos_dir().join("valid"));

    assert!(!valid_demos.is_empty(), "No valid demos found in demos/valid/");

    let mut failed_demos = Vec::new();

    for demo_path in &valid_demos {
        let args = args_for(vec![demo_path.to_string_lossy().to_string()]);

        if let Err(e) = run(&args) {
            failed_demos.push((demo_path.clone(), e));
        }
    }

    if !failed_demos.is_empty() {
        eprintln!("\nValid demos that failed:");
        for (path, err) in &failed_demos {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} valid demo(s) failed unexpectedly", failed_demos.len());
    }

    println!("✅ All {} valid demos passed", valid_demos.len());
}

#[test]
fn e2e_smoke_test_error_demos() {
    let error_demos = collect_shader_files(demos_dir().join("errors"));

    assert!(!error_demos.is_empty(), "No error demos found in demos/errors/");

    let mut unexpected = Vec::new();

    for demo_path in &error_demos {
        let args = args_for(vec![demo_path.to_string_lossy().to_string()]);

        match run(&args) {
            Err(CliError::Invalid { invalid: 1, total: 1 }) => {}
            other => unexpected.push((demo_path.clone(), format!("{other:?}"))),
        }
    }

    if !unexpected.is_empty() {
        eprintln!("\nError demos that did not fail validation:");
        for (path, outcome) in &unexpected {
            eprintln!("  - {}: {}", path.display(), outcome);
        }
        panic!("{} error demo(s) behaved unexpectedly", unexpected.len());
    }

    println!("✅ All {} error demos failed as expected", error_demos.len());
}

#[test]
fn e2e_batch_reports_every_invalid_file() {
    let mut files: Vec<_> = collect_shader_files(demos_dir().join("valid"))
        .into_iter()
        .chain(collect_shader_files(demos_dir().join("errors")))
        .map(|path| path.to_string_lossy().to_string())
        .collect();
    files.sort();
    let total = files.len();
    let errors = collect_shader_files(demos_dir().join("errors")).len();

    let result = run(&args_for(files));

    assert!(
        matches!(&result, Err(CliError::Invalid { invalid, total: t }) if *invalid == errors && *t == total),
        "unexpected outcome: {result:?}"
    );
}

#[test]
fn e2e_strict_mode_rejects_warnings() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let shader = temp_dir.path().join("unversioned.frag");
    fs::write(&shader, "void main() { gl_FragColor = vec4(1.0); }\n").unwrap();

    let path = shader.to_string_lossy().to_string();
    assert!(run(&args_for(vec![path.clone()])).is_ok());

    let strict = Args {
        strict: true,
        ..args_for(vec![path])
    };
    assert!(matches!(run(&strict), Err(CliError::Invalid { .. })));
}

#[test]
fn e2e_config_file_is_applied() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let shader = temp_dir.path().join("tiny.frag");
    fs::write(&shader, "#version 330\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n").unwrap();
    let config = temp_dir.path().join("prism.toml");
    fs::write(&config, "[limits]\nmax_source_bytes = 8\n").unwrap();

    let args = Args {
        config: Some(config.to_string_lossy().to_string()),
        ..args_for(vec![shader.to_string_lossy().to_string()])
    };

    assert!(matches!(run(&args), Err(CliError::Invalid { invalid: 1, .. })));
}

#[test]
fn e2e_unknown_extension_needs_format() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let shader = temp_dir.path().join("shader.txt");
    fs::write(&shader, "void main() {}\n").unwrap();
    let path = shader.to_string_lossy().to_string();

    assert!(matches!(
        run(&args_for(vec![path.clone()])),
        Err(CliError::UnknownFormat(_))
    ));

    let args = Args {
        format: Some("glsl".to_string()),
        ..args_for(vec![path])
    };
    assert!(run(&args).is_ok());
}
