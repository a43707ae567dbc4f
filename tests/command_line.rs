// tests/command_line.rs

use std::error::Error;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use playctl::engine::{Engine, LaunchRequest};
use playctl::errors::PlayctlError;
use playctl::exec::build_command_line;
use playctl_test_utils::builders::TestProject;
use playctl_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn base() -> Vec<String> {
    vec!["ansible-playbook".to_string()]
}

#[test]
fn full_request_produces_documented_order() -> TestResult {
    let project = TestProject::new();
    let inventory = project.write_inventory("[all]\nh1\n");
    let playbook = project.touch_playbook("site.yml");

    let request = LaunchRequest::new("site.yml")
        .hosts(["h1", "h2"])
        .tags(["t1", "t2"])
        .extra_var("a", "1")
        .extra_var("b", "2")
        .ask_password(true);

    let cmd = build_command_line(&base(), &inventory, &playbook, &request, project.path());

    assert_eq!(cmd.program, "ansible-playbook");
    assert_eq!(
        cmd.args,
        vec![
            "-i".to_string(),
            inventory.display().to_string(),
            playbook.display().to_string(),
            "-e".to_string(),
            "local=h1,h2".to_string(),
            "-t".to_string(),
            "t1,t2".to_string(),
            "-e".to_string(),
            "a=1".to_string(),
            "-e".to_string(),
            "b=2".to_string(),
            "-k".to_string(),
        ]
    );
    assert_eq!(cmd.working_dir, project.path());
    Ok(())
}

#[test]
fn missing_inventory_and_empty_request_give_playbook_only() {
    let cmd = build_command_line(
        &base(),
        Path::new("/definitely/not/here/inventory.ini"),
        Path::new("/srv/project/site.yml"),
        &LaunchRequest::new("site.yml"),
        Path::new("/srv/project"),
    );

    assert_eq!(cmd.args, vec!["/srv/project/site.yml".to_string()]);
    assert_eq!(cmd.argv(), vec!["ansible-playbook", "/srv/project/site.yml"]);
}

#[test]
fn base_command_prefix_is_kept_before_playbook_arguments() {
    let base = vec![
        "uv".to_string(),
        "run".to_string(),
        "ansible-playbook".to_string(),
    ];
    let cmd = build_command_line(
        &base,
        Path::new("/nope/inventory.ini"),
        Path::new("/srv/site.yml"),
        &LaunchRequest::new("site.yml").tags(["web"]),
        Path::new("/srv"),
    );

    assert_eq!(cmd.program, "uv");
    assert_eq!(cmd.args, vec!["run", "ansible-playbook", "/srv/site.yml", "-t", "web"]);
}

#[test]
fn extra_var_values_are_passed_verbatim() {
    let cmd = build_command_line(
        &base(),
        Path::new("/nope/inventory.ini"),
        Path::new("/srv/site.yml"),
        &LaunchRequest::new("site.yml").extra_var("msg", "hello world; rm -rf /"),
        Path::new("/srv"),
    );

    assert!(cmd.has_arg_pair("-e", "msg=hello world; rm -rf /"));
    // Display quotes for readability only.
    assert_eq!(
        cmd.to_string(),
        "ansible-playbook /srv/site.yml -e 'msg=hello world; rm -rf /'"
    );
}

#[tokio::test]
async fn prepare_resolves_without_launching() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    let playbook = project.touch_playbook("deploy.yaml");
    let engine = project.engine_with_script("exit 99");

    let cmd = engine.prepare(&LaunchRequest::new("deploy.yaml").hosts(["web"]))?;
    assert_eq!(cmd.program, "sh");
    assert!(cmd.args.contains(&playbook.display().to_string()));
    assert!(cmd.has_arg_pair("-e", "local=web"));
    assert!(engine.list().is_empty());

    let missing = engine.prepare(&LaunchRequest::new("absent.yml"));
    assert!(matches!(missing, Err(PlayctlError::PlaybookNotFound(_))));
    Ok(())
}

#[tokio::test]
async fn snapshot_exposes_the_command_line() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.touch_playbook("site.yml");
    let engine: Engine = project.engine_with_script("true");

    let id = engine.launch(LaunchRequest::new("site.yml").tags(["db"]), None)?;
    let snap = engine.status(&id)?;

    assert_eq!(snap.argv.first().map(String::as_str), Some("sh"));
    assert!(snap.argv.ends_with(&["-t".to_string(), "db".to_string()]));
    assert!(snap.command.starts_with("sh -c "));
    Ok(())
}

fn word() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,7}"
}

proptest! {
    #[test]
    fn argument_layout_holds_for_any_request(
        hosts in proptest::collection::vec(word(), 0..4),
        tags in proptest::collection::vec(word(), 0..4),
        vars in proptest::collection::vec((word(), "[A-Za-z0-9=.]{0,8}"), 0..5),
        ask in any::<bool>(),
    ) {
        let mut request = LaunchRequest::new("site.yml")
            .hosts(hosts.clone())
            .tags(tags.clone())
            .ask_password(ask);
        for (k, v) in &vars {
            request = request.extra_var(format!("v_{k}"), v.clone());
        }

        let playbook = PathBuf::from("/p/site.yml");
        let cmd = build_command_line(
            &base(),
            Path::new("/does/not/exist.ini"),
            &playbook,
            &request,
            Path::new("/p"),
        );

        // Playbook first when there is no inventory.
        prop_assert_eq!(&cmd.args[0], "/p/site.yml");

        let e_count = cmd.args.iter().filter(|a| *a == "-e").count();
        let expected_e = request.extra_vars.len() + usize::from(!hosts.is_empty());
        prop_assert_eq!(e_count, expected_e);

        prop_assert_eq!(cmd.args.last().map(String::as_str) == Some("-k"), ask);
        prop_assert_eq!(cmd.has_arg_pair("-t", &tags.join(",")), !tags.is_empty());

        // Extra vars keep insertion order.
        let passed: Vec<String> = cmd
            .args
            .windows(2)
            .filter(|w| w[0] == "-e" && !w[1].starts_with("local="))
            .map(|w| w[1].clone())
            .collect();
        let expected: Vec<String> = request
            .extra_vars
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        prop_assert_eq!(passed, expected);
    }
}
