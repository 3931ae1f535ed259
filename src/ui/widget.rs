//! The floating chat widget: styles, DOM scaffold, and exchange script.
//!
//! The script is a single self-executing bundle a host page loads with one
//! `<script>` tag. It injects its own styles and DOM nodes, so running it
//! twice would duplicate the widget; hosts must include it once.

/// Widget bootstrap script.
///
/// Contract with the relay:
/// - `GET /config` resolves before the first exchange is attempted
/// - `POST /chat` carries `{message, thread_id}`; the returned `thread_id`
///   is held for the rest of the page session
/// - any failure renders the fixed fallback string instead of surfacing an
///   error to the host page
#[must_use]
pub fn widget_script() -> &'static str {
    WIDGET_SCRIPT
}

/// Demo page embedding the widget the way a host page would.
#[must_use]
pub fn demo_page() -> &'static str {
    DEMO_PAGE
}

const WIDGET_SCRIPT: &str = r##"(function () {
  const style = document.createElement('style');
  style.innerHTML = `
    #chat-widget-container { position: fixed; bottom: 40px; right: 30px; z-index: 9999; display: flex; flex-direction: column; align-items: flex-end; font-family: system-ui, sans-serif; font-size: 14px; }
    #chat-widget-container .hidden { display: none; }
    #chat-bubble { width: 56px; height: 56px; border-radius: 50%; background: #1a181e; color: #fff; display: flex; align-items: center; justify-content: center; cursor: pointer; font-size: 24px; box-shadow: 0 4px 12px rgba(0, 0, 0, 0.3); }
    #chat-popup { width: 360px; height: 70vh; max-height: 70vh; margin-bottom: 12px; background: #111827; color: #e5e7eb; border: 1px solid #6d28d9; border-radius: 8px; display: flex; flex-direction: column; overflow: hidden; transition: all 0.3s; }
    #chat-header { display: flex; justify-content: space-between; align-items: center; padding: 12px 16px; background: #111827; border-bottom: 1px solid #6d28d9; }
    #chat-header h3 { margin: 0; font-size: 16px; }
    #close-popup { background: transparent; border: none; color: #fff; cursor: pointer; font-size: 14px; }
    #chat-messages { flex: 1; padding: 16px; overflow-y: auto; }
    .chat-row { display: flex; margin-bottom: 12px; }
    .chat-row.user { justify-content: flex-end; }
    .chat-row > div { background: #1f2937; border-radius: 8px; padding: 8px 16px; max-width: 70%; white-space: pre-wrap; }
    #chat-input-container { padding: 16px; border-top: 1px solid #4c1d95; display: flex; gap: 12px; align-items: center; }
    #chat-input { flex: 1; border-radius: 6px; border: none; padding: 8px 12px; outline: none; }
    #chat-submit { background: #1f2937; color: #fff; border: none; border-radius: 6px; padding: 8px 16px; cursor: pointer; }
    .content-loader { display: none; padding: 4px 16px; }
    .typing-loader::after { color: #ffdead; content: 'Assistant is typing.....'; animation: blink 0.75s step-end infinite; font-size: 10px; }
    @keyframes blink { 50% { color: transparent; } }
    @media (max-width: 768px) { #chat-popup { position: fixed; top: 0; right: 0; bottom: 0; left: 0; width: 100%; height: 100%; max-height: 100%; border-radius: 0; } }
  `;
  document.head.appendChild(style);

  const chatWidgetContainer = document.createElement('div');
  chatWidgetContainer.id = 'chat-widget-container';
  document.body.appendChild(chatWidgetContainer);

  chatWidgetContainer.innerHTML = `
    <div id="chat-popup" class="hidden">
      <div id="chat-header">
        <h3>Assistant</h3>
        <button id="close-popup">X</button>
      </div>
      <div id="chat-messages"></div>
      <div class="content-loader"><div class="typing-loader"></div></div>
      <div id="chat-input-container">
        <input type="text" id="chat-input" placeholder="Type a message">
        <button id="chat-submit">Send</button>
      </div>
    </div>
    <div id="chat-bubble">&#128172;</div>`;

  const chatInput = document.getElementById('chat-input');
  const chatSubmit = document.getElementById('chat-submit');
  const chatBubble = document.getElementById('chat-bubble');
  const chatPopup = document.getElementById('chat-popup');
  const chatMessages = document.getElementById('chat-messages');
  const loader = chatWidgetContainer.querySelector('.content-loader');
  const closePopup = document.getElementById('close-popup');

  let threadId = null;

  // Configuration readiness is an awaited precondition of the first
  // exchange; user input is never raced against this fetch.
  const configReady = fetch('/config')
    .then((response) => {
      if (!response.ok) throw new Error('Failed to fetch config');
      return response.json();
    })
    .catch((error) => {
      console.error('Error fetching config:', error);
      return null;
    });

  async function sendMessage(message) {
    try {
      await configReady;
      const response = await fetch('/chat', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ message: message, thread_id: threadId }),
      });
      if (!response.ok) throw new Error('Failed to send message');
      const data = await response.json();
      if (data.error) throw new Error(data.error);
      threadId = data.thread_id;
      return data.reply;
    } catch (error) {
      console.error('Error in chat request:', error);
      return 'Sorry, something went wrong.';
    }
  }

  function appendBubble(role, text) {
    const row = document.createElement('div');
    row.className = 'chat-row ' + role;
    const bubble = document.createElement('div');
    bubble.textContent = text;
    row.appendChild(bubble);
    chatMessages.appendChild(row);
    chatMessages.scrollTop = chatMessages.scrollHeight;
  }

  async function onUserRequest(message) {
    if (!message.trim()) return;

    // The user bubble renders before any network call begins.
    appendBubble('user', message);
    chatInput.value = '';
    loader.style.display = 'inline-block';

    const replyMessage = await sendMessage(message);

    loader.style.display = 'none';
    appendBubble('assistant', replyMessage);
  }

  chatSubmit.addEventListener('click', () => onUserRequest(chatInput.value));
  chatInput.addEventListener('keyup', (event) => {
    if (event.key === 'Enter') chatSubmit.click();
  });
  chatBubble.addEventListener('click', () => chatPopup.classList.toggle('hidden'));
  closePopup.addEventListener('click', () => chatPopup.classList.toggle('hidden'));
})();
"##;

const DEMO_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Assistant chat widget demo">
    <title>Chat Widget Demo</title>
</head>
<body>
    <main style="font-family: system-ui, sans-serif; max-width: 40rem; margin: 4rem auto; padding: 0 1rem;">
        <h1>Chat Widget Demo</h1>
        <p>
            This page stands in for any host page embedding the widget. The
            floating bubble in the corner is injected by a single script tag;
            everything it sends goes through this server's relay endpoint.
        </p>
        <pre>&lt;script src="/widget.js"&gt;&lt;/script&gt;</pre>
    </main>
    <script src="/widget.js"></script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_contains_contract_dom_surface() {
        let script = widget_script();
        for id in [
            "chat-widget-container",
            "chat-bubble",
            "chat-popup",
            "chat-header",
            "close-popup",
            "chat-messages",
            "chat-input",
            "chat-submit",
        ] {
            assert!(script.contains(id), "missing DOM id: {id}");
        }
        assert!(script.contains("typing-loader"));
        assert!(script.contains("classList.toggle('hidden')"));
    }

    #[test]
    fn script_awaits_config_and_uses_relay_only() {
        let script = widget_script();
        assert!(script.contains("await configReady"));
        assert!(script.contains("fetch('/chat'"));
        // The credential never ships to the browser.
        assert!(!script.contains("api_key"));
        assert!(!script.contains("Authorization"));
    }

    #[test]
    fn script_renders_fallback_on_failure() {
        assert!(widget_script().contains("Sorry, something went wrong."));
    }

    #[test]
    fn demo_page_embeds_the_script() {
        assert!(demo_page().contains(r#"<script src="/widget.js"></script>"#));
    }
}
