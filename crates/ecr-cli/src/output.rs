use colored::Colorize;
use ecr_core::MatchTriggerStatus;
use ecr_engine::ActionDefinition;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_status_table(status: &MatchTriggerStatus) {
    println!(
        "{}: {}",
        "Action".cyan(),
        status.action_id.as_deref().unwrap_or("(none)")
    );
    println!("{}: {}", "Job status".cyan(), status.job_status.as_str());
    let flag = if status.trigger_match_status {
        "true".green()
    } else {
        "false".yellow()
    };
    println!("{}: {}", "Trigger match".cyan(), flag);

    if status.matched_codes.is_empty() {
        println!("No matched codes.");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(["Path", "ValueSet", "Version", "Codes"]);
    for record in &status.matched_codes {
        let codes = record
            .matched_codes
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        builder.push_record([
            record.path.as_str(),
            record.value_set.as_str(),
            record.value_set_version.as_str(),
            codes.as_str(),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}

pub fn print_actions_table(actions: &[ActionDefinition]) {
    if actions.is_empty() {
        println!("No actions configured.");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(["ID", "Type", "Trigger paths"]);
    for action in actions {
        let paths = action
            .trigger_data
            .iter()
            .map(|d| d.path.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        builder.push_record([action.id.as_str(), action.action_type.as_str(), paths.as_str()]);
    }
    println!("{}", builder.build().with(Style::rounded()));
}
