use clap::Subcommand;
use studyquest_core::StudyApi;

#[derive(Subcommand)]
pub enum AchievementsAction {
    /// Ask the backend to evaluate achievements now
    Check {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: AchievementsAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, api) = super::authenticated_api()?;
    match action {
        AchievementsAction::Check { json } => {
            let unlocked = api.check_achievements().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&unlocked)?);
            } else if unlocked.is_empty() {
                println!("no new achievements");
            } else {
                for a in &unlocked {
                    println!("{} {} (+{} pts)", a.icon, a.name, a.points_reward);
                }
            }
        }
    }
    Ok(())
}
