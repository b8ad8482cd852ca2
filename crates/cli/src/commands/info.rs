use color_eyre::owo_colors::OwoColorize;

use crate::{config::Config, db::DbContext, output::OutputBuilder};

fn format_path<P: AsRef<std::path::Path>>(path: Option<P>) -> String {
    match path {
        None => "<none>".red().to_string(),
        Some(path) => path.as_ref().to_string_lossy().to_string(),
    }
}

pub fn info(db: DbContext, config: Config) -> color_eyre::Result<()> {
    let mut output = OutputBuilder::new("Configuration");

    output.property("Python environment", format_path(config.python_env()));
    output.property("Driver script", format_path(config.driver_script()));
    output.property("Logs directory", format_path(config.log_dir()));

    match config.options.editor_port {
        Some(port) => output.property("Editor port", port),
        None => output.property("Editor port", "ephemeral"),
    }

    output.property(
        "Modify external Python?",
        config.options.allow_modify_external_python,
    );

    output.section("Addon directories", |builder| {
        for (index, dir) in config.addon_dirs().iter().enumerate() {
            builder.property(format!("{index}"), dir.to_string_lossy());
        }
    });

    output.section("Configuration search paths", |builder| {
        for (index, item) in config.known_dirs.config_dirs().enumerate() {
            builder.property(
                format!("{index}"),
                item.join("blaunch.toml").to_string_lossy(),
            );
        }
    });

    let entries = db.executables.load_all()?;

    output.section("Executable registry", |builder| {
        builder.property("Registry file", db.executables.path().to_string_lossy());

        for entry in &entries {
            let label = if entry.is_debug {
                format!("{} {}", entry.label(), "(debug)".yellow())
            } else {
                entry.label()
            };

            builder.property(label, entry.path.to_string_lossy());
        }
    });

    print!("{}", output.build());

    Ok(())
}
