use clap::{Parser, Subcommand};
use flasky::{
    config::AppConfig,
    db,
    repositories::{RoleRepository, SqliteRoleRepository, SqliteUserRepository},
    services::user_service::{CreateUserRequest, UpdatePasswordRequest, UserService},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "flasky-cli")]
#[command(about = "CLI tool for managing Flasky users and roles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Role management commands
    Roles {
        #[command(subcommand)]
        command: RoleCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Username shown on the profile page
        #[arg(short, long)]
        username: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,

        /// Mark the account as confirmed
        #[arg(long)]
        confirmed: bool,
    },

    /// List all users
    List {
        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Delete a user
    Delete {
        /// Email address of the user to delete
        #[arg(short, long)]
        email: String,
    },

    /// Confirm a user's account without the emailed link
    Confirm {
        /// Email address of the user to confirm
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password for a user
    SetPassword {
        /// Email address of the user
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum RoleCommands {
    /// Create or refresh the built-in roles
    Insert,
    /// List roles and their permission bits
    List,
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

fn confirm_password(prompt: &str) -> anyhow::Result<(String, String)> {
    let password = get_password(prompt)?;
    let confirm = get_password("Confirm password")?;
    Ok((password, confirm))
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let user_service = Arc::new(UserService::new(
        Arc::new(SqliteUserRepository::new(pool.clone())),
        Arc::new(SqliteRoleRepository::new(pool.clone())),
        config.admin_email.clone(),
    ));

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::Create {
                email,
                username,
                password,
                confirmed,
            } => {
                let (password, password_confirm) = match password {
                    Some(pw) => (pw.clone(), pw),
                    None => confirm_password("Password")?,
                };

                // New accounts need a default role to attach to.
                user_service.insert_roles().await?;

                let request = CreateUserRequest {
                    email,
                    username,
                    password,
                    password_confirm: Some(password_confirm),
                    confirmed,
                };

                match user_service.create_user(request).await {
                    Ok(user) => {
                        let role = user_service.role_for(&user).await?;
                        println!("✅ User created successfully!");
                        println!("  ID: {}", user.id);
                        println!("  Email: {}", user.email);
                        println!("  Username: {}", user.username);
                        println!("  Confirmed: {}", user.confirmed);
                        println!(
                            "  Role: {}",
                            role.map(|r| r.name).unwrap_or_else(|| "None".to_string())
                        );
                    }
                    Err(err) => fail(format!("Failed to create user: {}", err)),
                }
            }

            UserCommands::List { limit, offset } => {
                let users = user_service
                    .list_users(Some(limit), Some(offset))
                    .await
                    .unwrap_or_else(|err| fail(format!("Failed to list users: {}", err)));

                if users.is_empty() {
                    println!("No users found.");
                } else {
                    println!(
                        "{:<5} {:<32} {:<20} {:<10} {:<20}",
                        "ID", "Email", "Username", "Confirmed", "Created"
                    );
                    println!("{}", "-".repeat(90));
                    for user in users {
                        println!(
                            "{:<5} {:<32} {:<20} {:<10} {:<20}",
                            user.id,
                            user.email,
                            user.username,
                            if user.confirmed { "Yes" } else { "No" },
                            user.created_at.as_deref().unwrap_or("N/A")
                        );
                    }
                }
            }

            UserCommands::Delete { email } => match user_service.find_user_by_email(&email).await {
                Ok(Some(user)) => match user_service.delete_user(user.id).await {
                    Ok(()) => println!("✅ User '{}' deleted successfully!", email),
                    Err(err) => fail(format!("Failed to delete user: {}", err)),
                },
                Ok(None) => fail(format!("User '{}' not found", email)),
                Err(err) => fail(format!("Failed to find user: {}", err)),
            },

            UserCommands::Confirm { email } => match user_service.find_user_by_email(&email).await {
                Ok(Some(user)) if user.confirmed => {
                    println!("ℹ️  User '{}' is already confirmed", email);
                }
                Ok(Some(user)) => match user_service.confirm_user(user.id).await {
                    Ok(()) => println!("✅ User '{}' confirmed successfully!", email),
                    Err(err) => fail(format!("Failed to confirm user: {}", err)),
                },
                Ok(None) => fail(format!("User '{}' not found", email)),
                Err(err) => fail(format!("Failed to find user: {}", err)),
            },

            UserCommands::SetPassword { email, password } => {
                let user = match user_service.find_user_by_email(&email).await {
                    Ok(Some(user)) => user,
                    Ok(None) => fail(format!("User '{}' not found", email)),
                    Err(err) => fail(format!("Failed to find user: {}", err)),
                };

                let (new_password, password_confirm) = match password {
                    Some(pw) => (pw.clone(), pw),
                    None => confirm_password("New password")?,
                };

                let request = UpdatePasswordRequest {
                    user_id: user.id,
                    new_password,
                    new_password_confirm: Some(password_confirm),
                };

                match user_service.update_password(request).await {
                    Ok(()) => println!("✅ Password updated successfully for '{}'!", email),
                    Err(err) => fail(format!("Failed to update password: {}", err)),
                }
            }
        },

        Commands::Roles { command } => match command {
            RoleCommands::Insert => match user_service.insert_roles().await {
                Ok(roles) => {
                    for role in roles {
                        println!(
                            "✅ {} (permissions {:#07b}{})",
                            role.name,
                            role.permissions,
                            if role.is_default { ", default" } else { "" }
                        );
                    }
                }
                Err(err) => fail(format!("Failed to insert roles: {}", err)),
            },

            RoleCommands::List => {
                let roles = SqliteRoleRepository::new(pool.clone())
                    .list_roles()
                    .await
                    .unwrap_or_else(|err| fail(format!("Failed to list roles: {}", err)));

                if roles.is_empty() {
                    println!("No roles found. Run `roles insert` first.");
                }
                for role in roles {
                    println!(
                        "{:<5} {:<15} {:>3}{}",
                        role.id,
                        role.name,
                        role.permissions,
                        if role.is_default { "  (default)" } else { "" }
                    );
                }
            }
        },
    }

    Ok(())
}
