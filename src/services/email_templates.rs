use askama::Template;

/// An email with a plain text body and an HTML alternative.
pub trait EmailTemplate {
    fn render_text(&self) -> askama::Result<String>;
    fn render_html(&self) -> askama::Result<String>;
}

#[derive(Template)]
#[template(path = "auth/email/confirm.html")]
pub struct ConfirmAccountEmail {
    pub username: String,
    pub confirm_url: String,
}

#[derive(Template)]
#[template(path = "auth/email/confirm.txt")]
struct ConfirmAccountText<'a> {
    email: &'a ConfirmAccountEmail,
}

impl EmailTemplate for ConfirmAccountEmail {
    fn render_text(&self) -> askama::Result<String> {
        ConfirmAccountText { email: self }.render()
    }

    fn render_html(&self) -> askama::Result<String> {
        self.render()
    }
}

#[derive(Template)]
#[template(path = "auth/email/reset_password.html")]
pub struct ResetPasswordEmail {
    pub username: String,
    pub reset_url: String,
}

#[derive(Template)]
#[template(path = "auth/email/reset_password.txt")]
struct ResetPasswordText<'a> {
    email: &'a ResetPasswordEmail,
}

impl EmailTemplate for ResetPasswordEmail {
    fn render_text(&self) -> askama::Result<String> {
        ResetPasswordText { email: self }.render()
    }

    fn render_html(&self) -> askama::Result<String> {
        self.render()
    }
}

#[derive(Template)]
#[template(path = "auth/email/change_email.html")]
pub struct ChangeEmailEmail {
    pub username: String,
    pub change_url: String,
}

#[derive(Template)]
#[template(path = "auth/email/change_email.txt")]
struct ChangeEmailText<'a> {
    email: &'a ChangeEmailEmail,
}

impl EmailTemplate for ChangeEmailEmail {
    fn render_text(&self) -> askama::Result<String> {
        ChangeEmailText { email: self }.render()
    }

    fn render_html(&self) -> askama::Result<String> {
        self.render()
    }
}

/// Sent to the administrator whenever somebody registers.
#[derive(Template)]
#[template(path = "mail/new_user.html")]
pub struct NewUserEmail {
    pub username: String,
    pub email: String,
}

#[derive(Template)]
#[template(path = "mail/new_user.txt")]
struct NewUserText<'a> {
    email: &'a NewUserEmail,
}

impl EmailTemplate for NewUserEmail {
    fn render_text(&self) -> askama::Result<String> {
        NewUserText { email: self }.render()
    }

    fn render_html(&self) -> askama::Result<String> {
        self.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_body_escapes_username() {
        let email = ConfirmAccountEmail {
            username: "<b>john</b>".to_string(),
            confirm_url: "http://localhost/confirm/t".to_string(),
        };

        let html = email.render_html().unwrap();
        assert!(html.contains("&lt;b&gt;john&lt;/b&gt;"));

        let text = email.render_text().unwrap();
        assert!(text.contains("Dear <b>john</b>,"));
    }

    #[test]
    fn test_new_user_email_names_the_account() {
        let email = NewUserEmail {
            username: "susan".to_string(),
            email: "susan@example.com".to_string(),
        };

        let text = email.render_text().unwrap();
        assert!(text.contains("susan"));
        assert!(text.contains("susan@example.com"));
    }
}
