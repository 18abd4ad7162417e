use anyhow::Result;

use crate::config::Settings;
use crate::flows::{
    format_names_lines, format_plan_outcome_lines, run_address_command, run_mark_done_command,
    run_pending_command, run_plan_command, run_status_command, PlanRequest,
};
use crate::render::{render_status_line, TerminalRenderer};
use crate::Commands;

pub(crate) fn run_cli(command: Commands, settings: &Settings) -> Result<()> {
    let renderer = TerminalRenderer::from_style(settings.output);
    let state_dir = settings.state_dir.as_path();

    match command {
        Commands::Names => {
            renderer.print_section("upgrade names");
            renderer.print_lines(&format_names_lines());
        }
        Commands::Status => {
            renderer.print_section("status");
            renderer.print_lines(&run_status_command(state_dir, renderer.style())?);
        }
        Commands::Plan {
            name,
            height,
            info,
            commit,
        } => {
            let request = PlanRequest {
                name,
                height,
                info,
                commit,
            };
            let outcome = run_plan_command(state_dir, &request)?;
            renderer.print_section("execution plan");
            renderer.print_lines(&format_plan_outcome_lines(&outcome, renderer.style()));
        }
        Commands::MarkDone { name, height } => {
            let message = run_mark_done_command(state_dir, &name, height)?;
            println!("{}", render_status_line(renderer.style(), "ok", &message));
        }
        Commands::Pending { clear } => {
            renderer.print_section("pending plan");
            renderer.print_lines(&run_pending_command(state_dir, clear, renderer.style())?);
        }
        Commands::Address { addr } => {
            println!("{}", run_address_command(&addr)?);
        }
    }

    Ok(())
}
