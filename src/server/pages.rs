//! HTML front-ends: the single-page form and the dashboard

use html_escape::{encode_double_quoted_attribute, encode_text};

/// Questions offered on the dashboard
pub const EXAMPLE_QUESTIONS: &[&str] = &[
    "What is the main topic of the file?",
    "Who is the author of the file?",
];

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; background: #f6f7f9; margin: 0; }
#col-container { max-width: 720px; margin: 2rem auto; background: #fff; padding: 1.5rem 2rem; border-radius: 8px; box-shadow: 0 1px 4px rgba(0,0,0,.08); }
label { display: block; font-weight: 600; margin: 1rem 0 .35rem; }
input[type=text], input[type=password], textarea { width: 100%; box-sizing: border-box; padding: .5rem; border: 1px solid #ccd; border-radius: 4px; font: inherit; }
textarea { min-height: 8rem; }
button, input[type=submit] { padding: .5rem 1rem; border: 0; border-radius: 4px; background: #3b6de0; color: #fff; font: inherit; cursor: pointer; }
#row-flex { display: flex; gap: .75rem; align-items: center; }
#row-flex > :first-child { flex: 3; }
.answer { white-space: pre-wrap; background: #f0f4ff; padding: .75rem; border-radius: 4px; }
.error { color: #b00020; font-weight: 600; }
.muted { color: #667; font-size: .9rem; }
.examples button { background: #e8ecf5; color: #223; margin: .25rem .25rem 0 0; }
"#;

/// State of the single-page form after a submit
#[derive(Debug, Default)]
pub struct FormView {
    pub api_key: String,
    pub question: String,
    pub file_name: Option<String>,
    pub answer: Option<String>,
    pub error: Option<String>,
}

/// Render the single-page form
pub fn form_page(view: &FormView) -> String {
    let mut result = String::new();
    if let Some(error) = &view.error {
        result.push_str(&format!("<p class=\"error\">{}</p>", encode_text(error)));
    }
    if let Some(answer) = &view.answer {
        let file = view
            .file_name
            .as_deref()
            .map(|f| format!("<p class=\"muted\">Answer from {}</p>", encode_text(f)))
            .unwrap_or_default();
        result.push_str(&format!("{}<div class=\"answer\">{}</div>", file, encode_text(answer)));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Ask your PDF</title>
<style>{style}</style>
</head>
<body>
<div id="col-container">
<h1>Ask your PDF 💬</h1>
<form method="post" action="/" enctype="multipart/form-data">
  <label for="api_key">Enter your OpenAI API key:</label>
  <input type="password" id="api_key" name="api_key" value="{api_key}" autocomplete="off">
  <label for="file">Upload your PDF</label>
  <input type="file" id="file" name="file" accept=".pdf,.txt,.md,.docx">
  <label for="question">Ask a question about your PDF:</label>
  <input type="text" id="question" name="question" value="{question}">
  <p><input type="submit" value="Ask"></p>
</form>
{result}
<p class="muted"><a href="/dashboard">Open the dashboard</a></p>
</div>
</body>
</html>
"#,
        style = STYLE,
        api_key = encode_double_quoted_attribute(&view.api_key),
        question = encode_double_quoted_attribute(&view.question),
        result = result,
    )
}

/// Render the dashboard; widgets talk to the session API from the browser
pub fn dashboard_page() -> String {
    let examples = EXAMPLE_QUESTIONS
        .iter()
        .map(|q| {
            format!(
                "<button type=\"button\" data-question=\"{}\">{}</button>",
                encode_double_quoted_attribute(q),
                encode_text(q)
            )
        })
        .collect::<Vec<_>>()
        .join("");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Ask your PDF - dashboard</title>
<style>{style}</style>
</head>
<body>
<div id="col-container">
<h1>Ask your PDF 💬</h1>
<label for="user_token">OpenAI API Key</label>
<input type="password" id="user_token" placeholder="OpenAI API Key" autocomplete="off">
<label>Upload your file</label>
<div id="row-flex">
  <input type="text" id="file_url" placeholder="Enter a url">
  <button type="button" id="browse">Browse File</button>
  <input type="file" id="upload" accept=".txt,.pdf,.md,.docx" hidden>
</div>
<p id="file_output" class="muted">No file loaded</p>
<label for="user_question">Ask a question about your file:</label>
<input type="text" id="user_question">
<label for="answer">Answer:</label>
<textarea id="answer" readonly></textarea>
<div class="examples"><span class="muted">Examples:</span> {examples}</div>
<p class="muted"><a href="/">Back to the simple form</a></p>
</div>
<script>
let sessionPromise = null;
const $ = (id) => document.getElementById(id);

// one pending request shared by every widget, so early events land in the same session
function session() {{
  if (!sessionPromise) {{
    sessionPromise = fetch('/api/sessions', {{ method: 'POST' }})
      .then((r) => r.json())
      .then((body) => body.session_id)
      .catch((err) => {{ sessionPromise = null; throw err; }});
  }}
  return sessionPromise;
}}

async function api(path, options) {{
  const id = await session();
  const r = await fetch(`/api/sessions/${{id}}${{path}}`, options);
  const body = await r.json().catch(() => ({{}}));
  if (!r.ok) throw new Error(body.error || r.statusText);
  return body;
}}

function json(method, payload) {{
  return {{ method, headers: {{ 'Content-Type': 'application/json' }}, body: JSON.stringify(payload) }};
}}

function loaded(body) {{
  $('file_output').textContent = `${{body.file_name}} (${{body.chunks}} chunks)`;
  $('file_output').className = 'muted';
}}

function failed(target, err) {{
  target.textContent = err.message;
  target.className = 'error';
}}

$('user_token').addEventListener('change', async (e) => {{
  try {{ await api('/key', json('PUT', {{ api_key: e.target.value }})); }}
  catch (err) {{ failed($('file_output'), err); }}
}});

$('file_url').addEventListener('keydown', async (e) => {{
  if (e.key !== 'Enter') return;
  $('file_output').textContent = 'Loading...';
  try {{ loaded(await api('/url', json('POST', {{ url: e.target.value }}))); }}
  catch (err) {{ failed($('file_output'), err); }}
}});

$('browse').addEventListener('click', () => $('upload').click());
$('upload').addEventListener('change', async (e) => {{
  const file = e.target.files[0];
  if (!file) return;
  const form = new FormData();
  form.append('file', file, file.name);
  $('file_output').textContent = 'Loading...';
  try {{ loaded(await api('/upload', {{ method: 'POST', body: form }})); }}
  catch (err) {{ failed($('file_output'), err); }}
}});

async function ask() {{
  $('answer').value = '...';
  try {{
    const body = await api('/question', json('POST', {{ question: $('user_question').value }}));
    $('answer').value = body.answer;
  }} catch (err) {{
    $('answer').value = err.message;
  }}
}}

$('user_question').addEventListener('keydown', (e) => {{ if (e.key === 'Enter') ask(); }});
document.querySelectorAll('.examples button').forEach((b) =>
  b.addEventListener('click', () => {{ $('user_question').value = b.dataset.question; }}));
</script>
</body>
</html>
"#,
        style = STYLE,
        examples = examples,
    )
}
