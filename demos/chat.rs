use cogsvc_http::{ChatMessage, ChatRequest, Dispatcher, DispatcherOptions, ServiceClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dispatcher = Dispatcher::new(DispatcherOptions::default()).with_observer(|event| {
        eprintln!(
            "attempt {}/{} failed ({}), retrying in {} ms",
            event.attempt,
            event.max_attempts,
            event.cause,
            event.delay.as_millis()
        );
    });

    // COGSVC_OPENAI_ENDPOINT, COGSVC_OPENAI_API_KEY, COGSVC_OPENAI_AUTH=api-key
    let chat = ServiceClient::from_env_with(dispatcher, "chat", "COGSVC_OPENAI")?;
    let path = std::env::var("COGSVC_OPENAI_DEPLOYMENT_PATH").unwrap_or_else(|_| {
        "openai/deployments/gpt-4/chat/completions?api-version=2025-01-01-preview".to_owned()
    });

    let mut messages = vec![ChatMessage::system(
        "You are a concise assistant. Keep answers under 50 words.",
    )];

    for question in std::env::args().skip(1) {
        messages.push(ChatMessage::user(question));
        let completion = chat
            .chat_completion(&path, &ChatRequest::new(messages.clone()).max_tokens(150))
            .await?;
        println!("{}", completion.content);
        messages.push(ChatMessage::assistant(completion.content));
    }

    Ok(())
}
