use axum::{response::Html, routing::get, Router};

pub fn router() -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/admin", get(admin_page))
}

async fn chat_page() -> Html<&'static str> {
    Html(r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>KopaKopi - Menu Assistant</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; background: #f5efe6; color: #2b1d14; }
    main { max-width: 720px; margin: 0 auto; padding: 1.5rem; display: flex; flex-direction: column; height: 100vh; box-sizing: border-box; }
    #messages { flex: 1; overflow-y: auto; }
    .msg { padding: 0.75rem 1rem; border-radius: 12px; margin: 0.5rem 0; white-space: pre-wrap; max-width: 85%; }
    .user { background: #6f4e37; color: #fff; margin-left: auto; }
    .ai { background: #fff; border: 1px solid #e0d6c8; }
    #suggestions button { margin: 0.25rem; padding: 0.4rem 0.8rem; border-radius: 16px; border: 1px solid #6f4e37; background: #fff; cursor: pointer; }
    form { display: flex; gap: 0.5rem; margin-top: 0.75rem; }
    input { flex: 1; padding: 0.6rem; border-radius: 8px; border: 1px solid #c9b8a3; }
    button[type=submit] { padding: 0.6rem 1rem; border-radius: 8px; border: none; background: #6f4e37; color: #fff; }
  </style>
</head>
<body>
<main>
  <h1>KopaKopi</h1>
  <div id="messages"></div>
  <div id="suggestions"></div>
  <form id="chatForm">
    <input id="question" placeholder="Ask about our menu..." autocomplete="off" />
    <button type="submit">Send</button>
  </form>
</main>
<script>
  const suggested = [
    'Any coffee recommendations that are not too bitter?',
    'Show me the whole menu with prices',
    'Which non-coffee drinks do you have?',
    'Which coffee beans are for sale?'
  ];
  const history = [
    { sender: 'ai', text: 'Hello! Welcome to KopaKopi. Ask anything about our menu, recommendations, or coffee bean availability.' }
  ];
  const messagesEl = document.getElementById('messages');
  const suggestionsEl = document.getElementById('suggestions');
  const form = document.getElementById('chatForm');
  const input = document.getElementById('question');
  let busy = false;

  function render(sender, text) {
    const div = document.createElement('div');
    div.className = 'msg ' + (sender === 'user' ? 'user' : 'ai');
    div.textContent = text;
    messagesEl.appendChild(div);
    messagesEl.scrollTop = messagesEl.scrollHeight;
    return div;
  }

  async function ask(question) {
    if (busy || !question.trim()) return;
    busy = true;
    suggestionsEl.style.display = 'none';
    const prior = history.slice();
    history.push({ sender: 'user', text: question });
    render('user', question);
    const answerEl = render('ai', '...');
    let answer = '';
    try {
      const res = await fetch('/api/chat', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ question, history: prior })
      });
      if (!res.ok || !res.body) {
        const err = await res.json().catch(() => ({}));
        throw new Error(err.error || 'Request failed');
      }
      const reader = res.body.getReader();
      const decoder = new TextDecoder();
      while (true) {
        const { value, done } = await reader.read();
        if (done) break;
        answer += decoder.decode(value, { stream: true });
        answerEl.textContent = answer;
        messagesEl.scrollTop = messagesEl.scrollHeight;
      }
      history.push({ sender: 'ai', text: answer });
    } catch (e) {
      answerEl.textContent = 'Sorry, something went wrong: ' + e.message;
    } finally {
      busy = false;
    }
  }

  history.forEach(m => render(m.sender, m.text));
  suggested.forEach(q => {
    const b = document.createElement('button');
    b.textContent = q;
    b.addEventListener('click', () => ask(q));
    suggestionsEl.appendChild(b);
  });
  form.addEventListener('submit', e => {
    e.preventDefault();
    const q = input.value;
    input.value = '';
    ask(q);
  });
</script>
</body>
</html>"#)
}

async fn admin_page() -> Html<&'static str> {
    Html(r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>KopaKopi - Admin</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
    .card { border: 1px solid #ddd; padding: 1rem; border-radius: 8px; max-width: 420px; }
    input { width: 100%; padding: 0.5rem; margin-top: 0.5rem; box-sizing: border-box; }
    button { margin-top: 1rem; padding: 0.6rem 1rem; }
    #status { margin-top: 1rem; white-space: pre-wrap; }
  </style>
</head>
<body>
  <h1>Admin</h1>
  <div class="card">
    <form id="uploadForm">
      <label>Password</label>
      <input id="password" type="password" placeholder="Admin password" />
      <label>Menu CSV (Name, Price, Description, Stock)</label>
      <input id="file" type="file" accept=".csv" />
      <button type="submit">Upload</button>
    </form>
    <div id="status"></div>
  </div>
  <script>
    const status = document.getElementById('status');
    document.getElementById('uploadForm').addEventListener('submit', async (e) => {
      e.preventDefault();
      const file = document.getElementById('file').files[0];
      if (!file) {
        status.textContent = 'Select a file first.';
        return;
      }
      const formData = new FormData();
      formData.append('knowledgeFile', file);
      formData.append('password', document.getElementById('password').value);
      status.textContent = 'Uploading and processing file...';
      try {
        const res = await fetch('/api/upload', { method: 'POST', body: formData });
        const json = await res.json();
        if (!res.ok) throw new Error(json.error || 'Upload failed.');
        status.textContent = json.message + '\n' + json.details;
      } catch (err) {
        status.textContent = 'Error: ' + err.message;
      }
    });
  </script>
</body>
</html>"#)
}
