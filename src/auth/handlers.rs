use crate::auth::extractors::{CurrentUser, RequireAnonymous, RequireUser};
use crate::auth::session::{login_user, logout_user};
use crate::error::AppError;
use crate::flash::flash;
use crate::forms::{
    ChangeEmailForm, ChangePasswordForm, FormErrors, LoginForm, PasswordResetForm,
    PasswordResetRequestForm, RegistrationForm,
};
use crate::handlers::page::PageContext;
use crate::middleware::csrf::validate_csrf_form_field;
use crate::services::{
    auth_service::{AuthServiceError, LoginRequest},
    user_service::{CreateUserRequest, UpdatePasswordRequest, UserServiceError},
    AuthTokenError,
};
use crate::AppState;
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Form, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

type HandlerResult = Result<Response, AppError>;

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    page: PageContext,
    form: LoginForm,
    errors: FormErrors,
    form_action: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
struct RegisterTemplate {
    page: PageContext,
    form: RegistrationForm,
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/unconfirmed.html")]
struct UnconfirmedTemplate {
    page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/change_password.html")]
struct ChangePasswordTemplate {
    page: PageContext,
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_request.html")]
struct ResetRequestTemplate {
    page: PageContext,
    form: PasswordResetRequestForm,
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
struct ResetPasswordTemplate {
    page: PageContext,
    token: String,
    errors: FormErrors,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/change_email.html")]
struct ChangeEmailTemplate {
    page: PageContext,
    form: ChangeEmailForm,
    errors: FormErrors,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

/// Only same-site absolute paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

async fn flash_redirect(session: &Session, message: &str, to: &str) -> HandlerResult {
    flash(session, message).await?;
    Ok(Redirect::to(to).into_response())
}

async fn render_login(
    session: &Session,
    current: CurrentUser,
    mut form: LoginForm,
    errors: FormErrors,
    next: Option<String>,
) -> HandlerResult {
    form.password.clear();
    let form_action = match next {
        Some(next) => format!("/login?next={}", urlencoding::encode(&next)),
        None => "/login".to_string(),
    };

    Ok(LoginTemplate {
        page: PageContext::load(session, current.0).await?,
        form,
        errors,
        form_action,
    }
    .into_response())
}

/// GET /login
pub async fn login_page(
    session: Session,
    current: CurrentUser,
    Query(query): Query<NextQuery>,
) -> HandlerResult {
    render_login(
        &session,
        current,
        LoginForm::default(),
        FormErrors::default(),
        query.next,
    )
    .await
}

/// POST /login
pub async fn login_handler(
    State(state): State<AppState>,
    session: Session,
    current: CurrentUser,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let errors = form.validate();
    if errors.is_empty() {
        let request = LoginRequest {
            email: form.email.clone(),
            password: form.password.clone(),
        };

        match state.auth_service.authenticate(request).await {
            Ok(user) => {
                login_user(&session, &user, form.remember()).await?;
                tracing::info!("User {} logged in", user.id);
                return Ok(Redirect::to(safe_next(query.next.as_deref())).into_response());
            }
            Err(AuthServiceError::InvalidCredentials) => {
                flash(&session, "Invalid email or password.").await?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    render_login(&session, current, form, errors, query.next).await
}

/// GET /logout
pub async fn logout_handler(session: Session, RequireUser(user): RequireUser) -> HandlerResult {
    logout_user(&session).await?;
    tracing::info!("User {} logged out", user.id);
    flash_redirect(&session, "You have been logged out.", "/").await
}

/// GET /register
pub async fn register_page(session: Session, CurrentUser(current): CurrentUser) -> HandlerResult {
    Ok(RegisterTemplate {
        page: PageContext::load(&session, current).await?,
        form: RegistrationForm::default(),
        errors: FormErrors::default(),
    }
    .into_response())
}

/// POST /register
pub async fn register_handler(
    State(state): State<AppState>,
    session: Session,
    CurrentUser(current): CurrentUser,
    Form(mut form): Form<RegistrationForm>,
) -> HandlerResult {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let mut errors = form.validate();
    if errors.is_empty() {
        let request = CreateUserRequest {
            email: form.email.clone(),
            username: form.username.clone(),
            password: form.password.clone(),
            password_confirm: Some(form.password2.clone()),
            confirmed: false,
        };

        match state.auth_token_service.register_user(request).await {
            Ok(user) => {
                tracing::info!("Registered user {} ({})", user.id, user.username);
                return flash_redirect(
                    &session,
                    "A confirmation email has been sent to you by email.",
                    "/login",
                )
                .await;
            }
            Err(AuthTokenError::UserServiceError(UserServiceError::EmailTaken)) => {
                errors.add("email", "Email already registered.");
            }
            Err(AuthTokenError::UserServiceError(UserServiceError::UsernameTaken)) => {
                errors.add("username", "Username already in use.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    form.password.clear();
    form.password2.clear();
    Ok(RegisterTemplate {
        page: PageContext::load(&session, current).await?,
        form,
        errors,
    }
    .into_response())
}

/// GET /confirm/{token}
pub async fn confirm_handler(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(token): Path<String>,
) -> HandlerResult {
    if user.confirmed {
        return Ok(Redirect::to("/").into_response());
    }

    let message = if state.auth_token_service.confirm(&user, &token).await? {
        tracing::info!("User {} confirmed their account", user.id);
        "You have confirmed your account. Thanks!"
    } else {
        "The confirmation link is invalid or has expired."
    };

    flash_redirect(&session, message, "/").await
}

/// GET /confirm
pub async fn resend_confirmation_handler(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> HandlerResult {
    state.auth_token_service.send_confirmation(&user)?;
    flash_redirect(
        &session,
        "A new confirmation email has been sent to you by email.",
        "/",
    )
    .await
}

/// GET /unconfirmed
pub async fn unconfirmed_page(
    session: Session,
    CurrentUser(current): CurrentUser,
) -> HandlerResult {
    match current {
        Some(user) if !user.confirmed => Ok(UnconfirmedTemplate {
            page: PageContext::load(&session, Some(user)).await?,
        }
        .into_response()),
        _ => Ok(Redirect::to("/").into_response()),
    }
}

/// GET /change-password
pub async fn change_password_page(
    session: Session,
    RequireUser(user): RequireUser,
) -> HandlerResult {
    Ok(ChangePasswordTemplate {
        page: PageContext::load(&session, Some(user)).await?,
        errors: FormErrors::default(),
    }
    .into_response())
}

/// POST /change-password
pub async fn change_password_handler(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<ChangePasswordForm>,
) -> HandlerResult {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let errors = form.validate();
    if errors.is_empty() {
        if state
            .user_service
            .verify_password(&form.old_password, &user.password_hash)
        {
            let request = UpdatePasswordRequest {
                user_id: user.id,
                new_password: form.password.clone(),
                new_password_confirm: Some(form.password2.clone()),
            };
            state.user_service.update_password(request).await?;
            tracing::info!("User {} changed their password", user.id);
            return flash_redirect(&session, "Your password has been updated.", "/").await;
        }
        flash(&session, "Invalid password.").await?;
    }

    Ok(ChangePasswordTemplate {
        page: PageContext::load(&session, Some(user)).await?,
        errors,
    }
    .into_response())
}

/// GET /reset
pub async fn reset_request_page(session: Session, _anonymous: RequireAnonymous) -> HandlerResult {
    Ok(ResetRequestTemplate {
        page: PageContext::load(&session, None).await?,
        form: PasswordResetRequestForm::default(),
        errors: FormErrors::default(),
    }
    .into_response())
}

/// POST /reset
pub async fn reset_request_handler(
    State(state): State<AppState>,
    session: Session,
    _anonymous: RequireAnonymous,
    Form(form): Form<PasswordResetRequestForm>,
) -> HandlerResult {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let errors = form.validate();
    if errors.is_empty() {
        state
            .auth_token_service
            .send_password_reset(&form.email)
            .await?;
        return flash_redirect(
            &session,
            "An email with instructions to reset your password has been sent to you.",
            "/login",
        )
        .await;
    }

    Ok(ResetRequestTemplate {
        page: PageContext::load(&session, None).await?,
        form,
        errors,
    }
    .into_response())
}

/// GET /reset/{token}
pub async fn reset_password_page(
    session: Session,
    _anonymous: RequireAnonymous,
    Path(token): Path<String>,
) -> HandlerResult {
    Ok(ResetPasswordTemplate {
        page: PageContext::load(&session, None).await?,
        token,
        errors: FormErrors::default(),
    }
    .into_response())
}

/// POST /reset/{token}
pub async fn reset_password_handler(
    State(state): State<AppState>,
    session: Session,
    _anonymous: RequireAnonymous,
    Path(token): Path<String>,
    Form(form): Form<PasswordResetForm>,
) -> HandlerResult {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let errors = form.validate();
    if !errors.is_empty() {
        return Ok(ResetPasswordTemplate {
            page: PageContext::load(&session, None).await?,
            token,
            errors,
        }
        .into_response());
    }

    if state
        .auth_token_service
        .reset_password(&token, &form.password)
        .await?
    {
        flash_redirect(&session, "Your password has been updated.", "/login").await
    } else {
        Ok(Redirect::to("/").into_response())
    }
}

/// GET /change-email
pub async fn change_email_page(session: Session, RequireUser(user): RequireUser) -> HandlerResult {
    Ok(ChangeEmailTemplate {
        page: PageContext::load(&session, Some(user)).await?,
        form: ChangeEmailForm::default(),
        errors: FormErrors::default(),
    }
    .into_response())
}

/// POST /change-email
pub async fn change_email_handler(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(mut form): Form<ChangeEmailForm>,
) -> HandlerResult {
    validate_csrf_form_field(&session, &form.csrf_token).await?;

    let mut errors = form.validate();
    if errors.is_empty()
        && state
            .user_service
            .find_user_by_email(&form.email)
            .await?
            .is_some()
    {
        errors.add("email", "Email already registered.");
    }

    if errors.is_empty() {
        if state
            .user_service
            .verify_password(&form.password, &user.password_hash)
        {
            state
                .auth_token_service
                .request_email_change(&user, &form.email)?;
            return flash_redirect(
                &session,
                "An email with instructions to confirm your new email address has been sent to you.",
                "/",
            )
            .await;
        }
        flash(&session, "Invalid email or password.").await?;
    }

    form.password.clear();
    Ok(ChangeEmailTemplate {
        page: PageContext::load(&session, Some(user)).await?,
        form,
        errors,
    }
    .into_response())
}

/// GET /change-email/{token}
pub async fn change_email_confirm_handler(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Path(token): Path<String>,
) -> HandlerResult {
    let message = if state.auth_token_service.change_email(&user, &token).await? {
        tracing::info!("User {} changed their email address", user.id);
        "Your email address has been updated."
    } else {
        "Invalid request."
    };

    flash_redirect(&session, message, "/").await
}
