// src/cli.rs

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::ClientError;
use crate::models::question::Question;
use crate::models::user::{ProfileUpdate, RegisterRequest, UserProfile};
use crate::quiz::adaptive::{AdaptiveQuiz, AdaptiveSource};
use crate::quiz::placement::PlacementQuiz;
use crate::quiz::presenter::{self, QuizSummary};
use crate::quiz::{Explanation, QuizOutcome, QuizScope, QuizStep};
use crate::session;
use crate::session::gate::{self, Decision, PlacementEntryDecision, RouteRequirement};
use crate::session::monitor::ExpirationMonitor;
use crate::session::store::{LocalSessionStore, SessionStore};

#[derive(Parser)]
#[command(
    name = "linguatech",
    about = "Terminal client for the LinguaTech language-learning platform"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an account and log in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,
    },
    /// Clear the persisted session
    Logout,
    /// Show the current session and placement state
    Status,
    /// List modules with progress
    Modules,
    /// List a module's categories with progress
    Categories {
        module_id: i64,
    },
    /// Take the one-shot placement quiz
    Placement,
    /// Take an adaptive quiz
    Quiz {
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        module: Option<i64>,
        #[arg(long)]
        category: Option<i64>,
        /// Fetch level-matched questions for this module instead
        #[arg(long)]
        by_level: Option<i64>,
        #[arg(long, default_value_t = 10)]
        quantity: u32,
    },
    /// Show the study streak
    Streak,
    /// Show lifetime answer statistics
    Stats,
    /// Show the user profile
    Profile {
        /// Change the account name
        #[arg(long)]
        rename: Option<String>,
    },
    /// Store the fallback generative-AI key
    SetAiKey {
        key: String,
    },
}

type Input = Lines<BufReader<Stdin>>;

/// How long a quiz pauses for an in-flight AI explanation.
const EXPLANATION_WAIT: Duration = Duration::from_secs(8);

pub async fn run(command: Command, config: Config) -> Result<(), ClientError> {
    let store = Arc::new(LocalSessionStore::open(config.session_file.clone()));
    let api = ApiClient::new(&config, store.clone())?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match command {
        Command::Register { name, email } => {
            let password = prompt(&mut input, "Password: ").await?;
            let auth = api
                .register(&RegisterRequest {
                    name,
                    email,
                    password,
                })
                .await?;
            session::establish(store.as_ref(), &auth, config.token_ttl_secs)?;
            println!("Welcome, {}!", auth.user.name);
            print_next_step(store.as_ref());
        }
        Command::Login { email } => {
            let password = prompt(&mut input, "Password: ").await?;
            let auth = api.login(&email, &password).await?;
            session::establish(store.as_ref(), &auth, config.token_ttl_secs)?;
            println!("Logged in as {}.", auth.user.name);
            print_next_step(store.as_ref());
        }
        Command::Logout => {
            store.clear()?;
            println!("Logged out.");
        }
        Command::Status => {
            let session = store.load();
            match session.user() {
                Some(user) => {
                    println!("Logged in as {} <{}>", user.name, user.email);
                    match user.placement() {
                        crate::models::user::PlacementLevel::Placed(level) => {
                            println!("Placement level: {}", level)
                        }
                        crate::models::user::PlacementLevel::Unplaced => {
                            println!("Placement pending: run `linguatech placement`")
                        }
                    }
                    if let Some(expiry) = session.token_expiry() {
                        println!("Session expires at {} (epoch ms)", expiry);
                    }
                }
                None => println!("Not logged in."),
            }
        }
        Command::Modules => {
            if !gate_allows(store.as_ref(), RouteRequirement::RequiresAuthAndPlacement) {
                return Ok(());
            }
            let modules = api.fetch_modules().await?;
            if modules.is_empty() {
                println!("No modules available yet.");
            }
            for module in modules {
                println!("{:>4}  {}  ({}%)", module.id, module.title, module.progress);
            }
        }
        Command::Categories { module_id } => {
            if !gate_allows(store.as_ref(), RouteRequirement::RequiresAuthAndPlacement) {
                return Ok(());
            }
            let categories = api.fetch_module_categories(module_id).await?;
            for category in categories {
                let progress = api.fetch_category_progress(module_id, category.id).await;
                println!("{:>4}  {}  ({}%)", category.id, category.name, progress);
            }
        }
        Command::Placement => {
            run_placement(&api, store, &config, &mut input).await?;
        }
        Command::Quiz {
            topic,
            module,
            category,
            by_level,
            quantity,
        } => {
            if !gate_allows(store.as_ref(), RouteRequirement::RequiresAuthAndPlacement) {
                return Ok(());
            }
            let scope = QuizScope {
                topic,
                module_id: module,
                category_id: category,
            };
            run_adaptive(&api, store, &config, &mut input, scope, by_level, quantity).await?;
        }
        Command::Streak => {
            if !gate_allows(store.as_ref(), RouteRequirement::RequiresAuth) {
                return Ok(());
            }
            let streak = api.fetch_streak().await?;
            println!(
                "Current streak: {} day(s), record: {}",
                streak.current_streak, streak.record_streak
            );
            if streak.weekly_progress.len() == 7 {
                let bars: Vec<String> = streak
                    .weekly_progress
                    .iter()
                    .map(|d| if *d > 0 { "#".to_string() } else { ".".to_string() })
                    .collect();
                println!("This week: {}", bars.join(""));
            }
        }
        Command::Stats => {
            if !gate_allows(store.as_ref(), RouteRequirement::RequiresAuth) {
                return Ok(());
            }
            let user_id = store
                .load()
                .user()
                .map(|u| u.id)
                .ok_or(ClientError::AuthRequired)?;
            let stats = api.fetch_answer_stats(user_id).await?;
            let summary = presenter::present(stats.correct, stats.total, None, Vec::new());
            println!(
                "Answered {} questions, {} correct ({}%).",
                stats.total, stats.correct, summary.percentage
            );
        }
        Command::Profile { rename } => {
            if !gate_allows(store.as_ref(), RouteRequirement::RequiresAuth) {
                return Ok(());
            }
            let profile = match rename {
                Some(name) => api.update_profile(&ProfileUpdate { name }).await?,
                None => api.fetch_profile().await?,
            };
            print_profile(&profile);
        }
        Command::SetAiKey { key } => {
            store.set_gemini_api_key(&key)?;
            println!("Fallback AI key stored.");
        }
    }
    Ok(())
}

/// CLI analog of the route gate: prints where the user was redirected and
/// reports whether the command may proceed.
fn gate_allows(store: &dyn SessionStore, requirement: RouteRequirement) -> bool {
    match gate::decide(&store.load(), requirement) {
        Decision::Allow => true,
        Decision::RedirectLogin => {
            println!("You are not logged in. Run `linguatech login` first.");
            false
        }
        Decision::RedirectPlacement => {
            println!("Take the placement quiz first: `linguatech placement`.");
            false
        }
    }
}

fn print_next_step(store: &dyn SessionStore) {
    if !store.is_placed() {
        println!("Next step: `linguatech placement` to find your level.");
    }
}

async fn run_placement(
    api: &ApiClient,
    store: Arc<LocalSessionStore>,
    config: &Config,
    input: &mut Input,
) -> Result<(), ClientError> {
    match gate::decide_placement_entry(&store.load()) {
        PlacementEntryDecision::RedirectLogin => {
            println!("You are not logged in. Run `linguatech login` first.");
            return Ok(());
        }
        PlacementEntryDecision::AlreadyPlaced => {
            println!("You already have a placement level; nothing to do here.");
            return Ok(());
        }
        PlacementEntryDecision::Allow => {}
    }

    let _monitor = spawn_monitor(store.clone(), config);

    let mut quiz = PlacementQuiz::load(
        api,
        Arc::new(api.clone()),
        Arc::new(api.clone()),
        Arc::new(api.clone()),
        store.clone(),
    )
    .await?;
    if quiz.is_empty() {
        println!("No placement questions are available right now.");
        return Ok(());
    }

    println!("Welcome quiz: answer each question to find your starting level.");
    let outcome = 'quiz: loop {
        let question = match quiz.current_question() {
            Some(q) => q.clone(),
            None => break 'quiz None,
        };
        // Late explanations from earlier questions surface out-of-band.
        while let Some(explanation) = quiz.try_next_explanation() {
            println!(
                "(AI explanation for question {}): {}",
                explanation.question_id, explanation.text
            );
        }

        let (pos, total) = quiz.progress();
        let selected = ask_question(input, &question, pos, total).await?;
        let Some(selected) = selected else {
            println!("Quiz abandoned; nothing was submitted.");
            return Ok(());
        };

        let correct = quiz.check_answer(Some(selected.as_str()))?;
        if correct {
            println!("Correct!");
        } else {
            announce_wrong(&question);
            show_explanation(&mut quiz, question.id).await;
        }

        match quiz.advance().await {
            Ok(QuizStep::Next) => {}
            Ok(QuizStep::Finished(outcome)) => break 'quiz Some(outcome),
            Err(e) => {
                eprintln!("{}", e.user_message());
                loop {
                    let again = prompt(input, "Retry submission? [y/N]: ").await?;
                    if !again.eq_ignore_ascii_case("y") {
                        println!("Leaving without a placement; run the quiz again later.");
                        return Ok(());
                    }
                    match quiz.retry_submit().await {
                        Ok(outcome) => break 'quiz Some(outcome),
                        Err(e) => eprintln!("{}", e.user_message()),
                    }
                }
            }
        }
    };

    if let Some(outcome) = outcome {
        let placement = outcome.placement.clone();
        finish_quiz(api, outcome).await;
        if let Some(placement) = placement {
            println!(
                "Your level: {} ({})",
                placement.placement_level, placement.level_label
            );
        }
    }
    Ok(())
}

async fn run_adaptive(
    api: &ApiClient,
    store: Arc<LocalSessionStore>,
    config: &Config,
    input: &mut Input,
    scope: QuizScope,
    by_level: Option<i64>,
    quantity: u32,
) -> Result<(), ClientError> {
    let _monitor = spawn_monitor(store.clone(), config);

    let unscoped = by_level.is_none()
        && scope.topic.is_none()
        && scope.module_id.is_none()
        && scope.category_id.is_none();
    let source = match by_level {
        Some(module_id) => AdaptiveSource::ByLevel {
            module_id,
            quantity,
        },
        None => AdaptiveSource::Filtered(scope),
    };

    // An unscoped run first consumes any question list stashed by an
    // earlier navigation; explicit filters always fetch fresh.
    let mut quiz = if unscoped {
        match AdaptiveQuiz::load(
            AdaptiveSource::Prepared,
            api,
            Arc::new(api.clone()),
            Arc::new(api.clone()),
            Arc::new(api.clone()),
            store.clone(),
        )
        .await
        {
            Ok(quiz) => quiz,
            Err(ClientError::Validation(_)) => {
                AdaptiveQuiz::load(
                    source,
                    api,
                    Arc::new(api.clone()),
                    Arc::new(api.clone()),
                    Arc::new(api.clone()),
                    store.clone(),
                )
                .await?
            }
            Err(e) => return Err(e),
        }
    } else {
        AdaptiveQuiz::load(
            source,
            api,
            Arc::new(api.clone()),
            Arc::new(api.clone()),
            Arc::new(api.clone()),
            store.clone(),
        )
        .await?
    };
    if quiz.is_empty() {
        println!("No questions were found for this selection.");
        return Ok(());
    }

    let outcome = loop {
        let question = match quiz.current_question() {
            Some(q) => q.clone(),
            None => return Ok(()),
        };
        while let Some(explanation) = quiz.try_next_explanation() {
            println!(
                "(AI explanation for question {}): {}",
                explanation.question_id, explanation.text
            );
        }

        let (pos, total) = quiz.progress();
        let selected = ask_question(input, &question, pos, total).await?;
        let Some(selected) = selected else {
            println!("Quiz abandoned; nothing was submitted.");
            return Ok(());
        };

        let correct = quiz.check_answer(Some(selected.as_str()))?;
        if correct {
            println!("Correct!");
        } else {
            announce_wrong(&question);
            show_explanation(&mut quiz, question.id).await;
        }

        match quiz.advance().await? {
            QuizStep::Next => {}
            QuizStep::Finished(outcome) => break outcome,
        }
    };

    finish_quiz(api, outcome).await;
    Ok(())
}

fn spawn_monitor(store: Arc<LocalSessionStore>, config: &Config) -> ExpirationMonitor {
    ExpirationMonitor::spawn(
        store as Arc<dyn SessionStore>,
        Duration::from_secs(config.expiry_check_interval_secs),
        || {
            println!("\nYour session expired. Please log in again.");
            std::process::exit(1);
        },
    )
}

/// Shows a question and reads the chosen option. `None` means the user
/// quit the quiz.
async fn ask_question(
    input: &mut Input,
    question: &Question,
    pos: usize,
    total: usize,
) -> Result<Option<String>, ClientError> {
    println!("\n[{}/{}] (level {}) {}", pos, total, question.level, question.text);
    for (index, option) in question.options.iter().enumerate() {
        println!("  {}) {}", index + 1, option.text);
    }
    loop {
        let line = prompt(input, "Answer (number, or q to quit): ").await?;
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if n >= 1 && n <= question.options.len() => {
                return Ok(Some(question.options[n - 1].id.clone()));
            }
            _ => println!("Pick a number between 1 and {}.", question.options.len()),
        }
    }
}

fn announce_wrong(question: &Question) {
    let correct = question
        .correct_option()
        .map(|o| o.text.as_str())
        .unwrap_or("(unknown)");
    println!("Incorrect. The right answer is: {}", correct);
}

/// How a received explanation is reported. Arrivals for superseded
/// questions are labeled, never misattributed; `true` means the one we
/// were waiting for arrived.
fn report_explanation(explanation: &Explanation, question_id: i64) -> bool {
    if explanation.question_id == question_id {
        println!("AI explanation: {}", explanation.text);
        true
    } else {
        println!(
            "(AI explanation for question {}): {}",
            explanation.question_id, explanation.text
        );
        false
    }
}

/// Receive side of a quiz engine's explanation feed, so the wait loop is
/// written once for both engines.
#[async_trait]
trait ExplanationFeed {
    async fn recv_explanation(&mut self) -> Option<Explanation>;
}

#[async_trait]
impl ExplanationFeed for PlacementQuiz {
    async fn recv_explanation(&mut self) -> Option<Explanation> {
        self.next_explanation().await
    }
}

#[async_trait]
impl ExplanationFeed for AdaptiveQuiz {
    async fn recv_explanation(&mut self) -> Option<Explanation> {
        self.next_explanation().await
    }
}

/// Waits briefly for the fire-and-forget explanation of `question_id`.
async fn show_explanation<F: ExplanationFeed>(quiz: &mut F, question_id: i64) {
    println!("Fetching AI explanation...");
    loop {
        match tokio::time::timeout(EXPLANATION_WAIT, quiz.recv_explanation()).await {
            Ok(Some(explanation)) => {
                if report_explanation(&explanation, question_id) {
                    return;
                }
            }
            _ => {
                println!("(explanation still pending; moving on)");
                return;
            }
        }
    }
}

/// Enriches wrong answers best-effort and prints the summary.
async fn finish_quiz(api: &ApiClient, mut outcome: QuizOutcome) {
    api.enrich_wrong_answers(&mut outcome.wrong_answers).await;
    print_summary(&presenter::present_outcome(outcome));
}

fn print_summary(summary: &QuizSummary) {
    println!(
        "\nResult: {}/{} ({}%)",
        summary.score, summary.total, summary.percentage
    );
    println!("{}", summary.tier.message());
    if summary.wrong_answers.is_empty() {
        return;
    }
    println!("\nReview these:");
    for wrong in &summary.wrong_answers {
        println!("- (level {}) {}", wrong.level, wrong.question);
        println!("    your answer:    {}", wrong.user_answer);
        println!("    correct answer: {}", wrong.correct_answer);
        if let Some(review) = &wrong.review {
            if !review.explanation.is_empty() {
                println!("    why: {}", review.explanation);
            }
            if !review.vocabulary.is_empty() {
                println!("    vocabulary: {}", review.vocabulary.join(", "));
            }
            for tip in &review.tips {
                println!("    tip: {}", tip);
            }
        }
    }
}

fn print_profile(profile: &UserProfile) {
    println!("{} <{}>", profile.name, profile.email);
    println!("Level: {}  Points: {}", profile.level, profile.points);
    println!(
        "Completed: {} module(s), {} lesson(s)",
        profile.completed_modules, profile.completed_lessons
    );
    if !profile.created_at.is_empty() {
        println!("Member since {}", profile.created_at);
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<String, ClientError> {
    print!("{}", label);
    std::io::stdout().flush().ok();
    let line = input
        .next_line()
        .await
        .map_err(|e| ClientError::Storage(e.to_string()))?;
    Ok(line.unwrap_or_default().trim().to_string())
}
