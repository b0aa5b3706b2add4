//! HTML pages for the authorization flow.

use crate::grant::PendingAuthorization;

const STYLE: &str = r#"<style>
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f5f5f5; margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }
.card { background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); padding: 32px; max-width: 400px; width: 100%; }
h1 { font-size: 20px; margin: 0 0 8px; color: #333; }
.subtitle { color: #666; font-size: 14px; margin: 0 0 24px; }
.error { background: #fee; border: 1px solid #c00; color: #c00; padding: 10px; border-radius: 4px; }
button { padding: 10px 16px; border: none; border-radius: 4px; font-size: 14px; font-weight: 500; cursor: pointer; margin-right: 10px; }
button[value="authorize"] { background: #4a90d9; color: #fff; }
button[value="cancel"] { background: #eee; color: #333; }
</style>"#;

/// Render the approval form for a pending authorization.
///
/// The form posts back to `action_url` so the original request parameters are
/// replayed alongside the decision.
pub fn render_authorize_page(
    pending: &PendingAuthorization,
    principal_name: &str,
    action_url: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Authorize</title>
{STYLE}
</head>
<body>
<div class="card">
<form name="oauth2_authorize_form" id="oauth2_authorize_form" method="POST" action="{action}">
<h1>Connect {client_name}</h1>
<p class="subtitle">Howdy <strong>{principal}</strong>, <strong>{client_name}</strong> would like to connect to your account.</p>
<p class="subtitle">{description}</p>
<input type="hidden" name="_wpnonce" value="{nonce}">
<button type="submit" name="wp-submit" value="authorize">Authorize</button>
<button type="submit" name="wp-submit" value="cancel">Cancel</button>
</form>
</div>
</body>
</html>"#,
        action = html_escape(action_url),
        client_name = html_escape(&pending.client.name),
        principal = html_escape(principal_name),
        description = html_escape(&pending.client.description),
        nonce = html_escape(&pending.nonce),
    )
}

/// Render a terminal error of the authorization flow.
pub fn render_error_page(code: &str, message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Authorization error</title>
{STYLE}
</head>
<body>
<div class="card">
<h1>Authorization error</h1>
<div class="error" data-code="{code}">{message}</div>
</div>
</body>
</html>"#,
        code = html_escape(code),
        message = html_escape(message),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
