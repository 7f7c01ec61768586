use super::*;

fn config(flag_format: FlagFormat, options: &[(&str, ToolOption)]) -> AgentConfig {
    AgentConfig {
        tool_name: ToolName::Claude,
        tool_version: "1.0".to_string(),
        prompt_template: "hi {{.n}}".to_string(),
        variables: BTreeMap::from([("n".to_string(), "A".to_string())]),
        tool_options: options
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        flag_format,
    }
}

#[test]
fn renders_the_exact_scenario_from_the_command_serialization_example() {
    let cfg = config(
        FlagFormat::Equals,
        &[
            ("model", ToolOption::String("m1".to_string())),
            ("verbose", ToolOption::Bool(true)),
            ("max_tokens", ToolOption::Number(1000.0)),
            ("timeout", ToolOption::Number(30.0)),
        ],
    );
    let argv = cfg.render_argv("hi A");
    assert_eq!(
        argv,
        vec![
            "claude",
            "--print",
            "--model=m1",
            "--timeout=30",
            "--verbose",
            "hi A",
        ]
    );
}

#[test]
fn space_format_emits_key_and_value_as_separate_args() {
    let cfg = config(
        FlagFormat::Space,
        &[("model", ToolOption::String("m1".to_string()))],
    );
    let argv = cfg.render_argv("prompt");
    assert_eq!(argv, vec!["claude", "--print", "--model", "m1", "prompt"]);
}

#[test]
fn bool_false_is_omitted() {
    let cfg = config(
        FlagFormat::Equals,
        &[("verbose", ToolOption::Bool(false))],
    );
    let argv = cfg.render_argv("prompt");
    assert_eq!(argv, vec!["claude", "--print", "prompt"]);
}

#[test]
fn empty_string_value_is_omitted() {
    let cfg = config(FlagFormat::Equals, &[("model", ToolOption::String(String::new()))]);
    let argv = cfg.render_argv("prompt");
    assert_eq!(argv, vec!["claude", "--print", "prompt"]);
}

#[test]
fn test_tool_wraps_prompt_in_sh_c() {
    let cfg = AgentConfig {
        tool_name: ToolName::Test,
        tool_version: "1.0".to_string(),
        prompt_template: String::new(),
        variables: BTreeMap::new(),
        tool_options: BTreeMap::new(),
        flag_format: FlagFormat::Space,
    };
    assert_eq!(
        cfg.render_argv("echo hi"),
        vec!["sh", "-c", "echo hi"]
    );
}
