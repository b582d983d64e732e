//! `analyst config`: show the configuration in effect.

use std::process::ExitCode;

use analyst_config::AppConfig;

pub fn show(config: &AppConfig, defaults: bool) -> ExitCode {
    println!("{}", render(config, defaults));
    ExitCode::SUCCESS
}

fn render(config: &AppConfig, defaults: bool) -> String {
    if defaults {
        AppConfig::default_toml()
    } else {
        format!(
            "# {}\n{}",
            AppConfig::config_dir().join("config.toml").display(),
            config.to_redacted_toml()
        )
    }
}
