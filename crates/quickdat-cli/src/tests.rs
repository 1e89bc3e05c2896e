use std::path::PathBuf;

use super::*;

#[test]
fn parses_extract_command() {
    let cli = Cli::try_parse_from(["quickdat", "extract", "page.html"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Extract { page } if page == PathBuf::from("page.html")
    ));
}

#[test]
fn parses_render_with_template() {
    let cli = Cli::try_parse_from([
        "quickdat",
        "render",
        "--record",
        "load.json",
        "--template",
        "body.txt",
    ])
    .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Render {
            template: Some(_),
            ..
        }
    ));
}

#[test]
fn render_requires_record() {
    assert!(Cli::try_parse_from(["quickdat", "render"]).is_err());
}

#[test]
fn parses_replay_command() {
    let cli = Cli::try_parse_from(["quickdat", "replay", "demos/late_email.yaml"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Replay { .. }));
}

#[test]
fn parses_settings_set_empty_body() {
    let cli = Cli::try_parse_from(["quickdat", "settings", "set-empty-body", "true"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Settings {
            command: SettingsCommands::SetEmptyBody { enabled: true }
        }
    ));
}

#[test]
fn parses_settings_restore_default() {
    let cli = Cli::try_parse_from(["quickdat", "settings", "restore-default"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Settings {
            command: SettingsCommands::RestoreDefault
        }
    ));
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["quickdat"]).is_err());
}
