//! `replay`: run a scenario through a live session and report what happened.

use std::path::Path;

use quickdat_compose::DispatchTargets;
use quickdat_core::{AppConfig, SettingsStore};
use quickdat_extract::{drive, Action, Page, Scenario, ScenarioPlayer, Session};

/// Lines printed after a replay: one per session event, then one per
/// requested action.
pub(crate) async fn replay_lines(
    session: &mut Session,
    page: &mut Page,
    scenario: &Scenario,
) -> anyhow::Result<Vec<String>> {
    let mut player = ScenarioPlayer::new(scenario)?;
    let mut lines = Vec::new();
    let elapsed = drive(session, page, &mut player, |event| {
        lines.push(event.to_string());
    })
    .await;
    tracing::info!(
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        popups = session.popup_count(),
        "replay settled"
    );

    for &action in &scenario.invoke {
        lines.push(action_line(session, page, action));
    }
    Ok(lines)
}

fn action_line(session: &Session, page: &Page, action: Action) -> String {
    match session.invoke_latest(page, action) {
        Ok(dispatch) => format!("{action}: {}", dispatch.url),
        Err(err) => {
            tracing::warn!(action = %action, error = %err, "action not dispatched");
            format!("{action}: {}", err.notice())
        }
    }
}

/// Replay the scenario at `path` with the configured settings and targets.
///
/// # Errors
///
/// Returns an error if the scenario or locator overrides cannot be loaded.
pub(crate) async fn run_replay(config: &AppConfig, path: &Path) -> anyhow::Result<()> {
    let scenario = Scenario::load(path)?;
    let locators = crate::load_locators(config)?;
    let settings = SettingsStore::new(&config.settings_path).load();
    let targets = DispatchTargets {
        mail_base_url: config.mail_base_url.clone(),
        maps_base_url: config.maps_base_url.clone(),
    };

    let mut session = Session::new(locators, settings, targets);
    let mut page = scenario.initial_page();
    for line in replay_lines(&mut session, &mut page, &scenario).await? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickdat_core::Settings;
    use quickdat_extract::LocatorSet;

    const SCENARIO: &str = r##"
page: |
  <html><body><div id="board"></div></body></html>
steps:
  - at_ms: 250
    op: append
    target: "#board"
    html: |
      <dat-load-details>
        <div class="trip-place"><div>Dallas, TX</div><div>Atlanta, GA</div></div>
        <a href="mailto:ops@broker.com">Email</a>
      </dat-load-details>
invoke: [email, route]
"##;

    #[tokio::test(start_paused = true)]
    async fn replay_reports_events_then_actions() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let mut session = Session::new(
            LocatorSet::default(),
            Settings {
                email_template: String::new(),
                empty_body_option: true,
            },
            DispatchTargets::default(),
        );
        let mut page = scenario.initial_page();
        let lines = replay_lines(&mut session, &mut page, &scenario).await.unwrap();

        assert!(lines.contains(&"popup#0 ready: Dallas, TX -> Atlanta, GA [route, email]".to_owned()));
        let tail = &lines[lines.len() - 2..];
        assert_eq!(
            tail[0],
            "email: https://mail.google.com/mail/?view=cm&fs=1&to=ops%40broker.com\
             &su=Load%20Inquiry%3A%20Dallas%2C%20TX%20to%20Atlanta%2C%20GA"
        );
        assert_eq!(
            tail[1],
            "route: https://www.google.com/maps/dir/Dallas%2C%20TX/Atlanta%2C%20GA"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn demo_scenario_replays() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/late_email.yaml");
        let scenario = Scenario::load(&path).unwrap();
        let mut session = Session::new(
            LocatorSet::default(),
            Settings::default(),
            DispatchTargets::default(),
        );
        let mut page = scenario.initial_page();
        let lines = replay_lines(&mut session, &mut page, &scenario).await.unwrap();

        assert!(lines.contains(&"popup#0 late email: ops@broker.com".to_owned()), "{lines:#?}");
        let route = &lines[lines.len() - 2];
        assert_eq!(
            route,
            "route: https://www.google.com/maps/dir/Fort%20Worth%2C%20TX/Dallas%2C%20TX/Atlanta%2C%20GA"
        );
        let email = &lines[lines.len() - 1];
        assert!(email.contains("%20(Aug%205)&body="), "{email}");
        assert!(!email.contains("Ref%3A"), "{email}");
    }

    #[tokio::test(start_paused = true)]
    async fn replay_without_popup_prints_notice() {
        let scenario = Scenario::from_yaml("page: '<body></body>'\ninvoke: [route]\n").unwrap();
        let mut session = Session::new(
            LocatorSet::default(),
            Settings::default(),
            DispatchTargets::default(),
        );
        let mut page = scenario.initial_page();
        let lines = replay_lines(&mut session, &mut page, &scenario).await.unwrap();
        assert_eq!(lines, ["route: Open a load's details first."]);
    }
}
