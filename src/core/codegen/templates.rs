//! Per-type code templates for actions and triggers.

use crate::core::document::{ActionType, Parameters, TriggerType};
use serde_json::Value;

/// Default applied when an optional parameter is absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Str(&'static str),
    Int(i64),
    EmptyMap,
    None,
}

impl ParamDefault {
    pub fn to_value(self) -> Value {
        match self {
            ParamDefault::Str(text) => Value::String(text.to_string()),
            ParamDefault::Int(number) => Value::from(number),
            ParamDefault::EmptyMap => Value::Object(serde_json::Map::new()),
            ParamDefault::None => Value::Null,
        }
    }
}

/// Contract and code for one action type.
#[derive(Debug)]
pub struct ActionTemplate {
    /// Name of the helper function the call site invokes.
    pub helper: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [(&'static str, ParamDefault)],
    /// Older parameter names still accepted, as `(canonical, alias)`.
    pub aliases: &'static [(&'static str, &'static str)],
    pub modules: &'static [&'static str],
    /// Hosts the helper itself may contact regardless of parameters.
    pub hosts: &'static [&'static str],
    /// Environment variables forwarded to the child when this template is used.
    pub credentials: &'static [&'static str],
    /// Parameters holding workspace-relative paths.
    pub path_params: &'static [&'static str],
    pub definition: &'static str,
}

impl ActionTemplate {
    /// Find a parameter by canonical name or alias.
    pub fn lookup<'a>(&self, params: &'a Parameters, name: &str) -> Option<&'a Value> {
        if let Some(value) = params.get(name) {
            return Some(value);
        }
        self.aliases
            .iter()
            .filter(|(canonical, _)| *canonical == name)
            .find_map(|(_, alias)| params.get(*alias))
    }

    /// Required parameters that are absent or null.
    pub fn missing_required(&self, params: &Parameters) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|name| matches!(self.lookup(params, name), None | Some(Value::Null)))
            .collect()
    }
}

/// Known action templates in the order their helpers are emitted.
pub static ACTION_TEMPLATE_ORDER: [&ActionTemplate; 7] = [
    &EMAIL_TEMPLATE,
    &MESSAGING_TEMPLATE,
    &WEB_TEMPLATE,
    &SCRAPE_TEMPLATE,
    &FILE_TEMPLATE,
    &AI_TEMPLATE,
    &DATA_TEMPLATE,
];

/// Template for an action type; `None` means the no-op fallback applies.
pub fn action_template(kind: &ActionType) -> Option<&'static ActionTemplate> {
    match kind {
        ActionType::Email => Some(&EMAIL_TEMPLATE),
        ActionType::Messaging => Some(&MESSAGING_TEMPLATE),
        ActionType::Web => Some(&WEB_TEMPLATE),
        ActionType::Scrape => Some(&SCRAPE_TEMPLATE),
        ActionType::File => Some(&FILE_TEMPLATE),
        ActionType::Ai => Some(&AI_TEMPLATE),
        ActionType::Data => Some(&DATA_TEMPLATE),
        ActionType::Custom(_) => None,
    }
}

pub static EMAIL_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_send_email",
    required: &["to", "subject", "body"],
    optional: &[
        ("smtp_host", ParamDefault::Str("smtp.gmail.com")),
        ("smtp_port", ParamDefault::Int(587)),
    ],
    aliases: &[("body", "message")],
    modules: &["email.message", "smtplib"],
    hosts: &[],
    credentials: &["WIZFLOW_SMTP_USER", "WIZFLOW_SMTP_PASSWORD"],
    path_params: &[],
    definition: r#"def _send_email(variables, to, subject, body, smtp_host, smtp_port):
    if _record("email", to=to, subject=subject, body=body):
        print(f"recorded email to {to}")
        return True
    username = os.environ.get("WIZFLOW_SMTP_USER")
    password = os.environ.get("WIZFLOW_SMTP_PASSWORD")
    if not username or not password:
        raise RuntimeError("WIZFLOW_SMTP_USER and WIZFLOW_SMTP_PASSWORD must be set to send email")
    message = email.message.EmailMessage()
    message["From"] = username
    message["To"] = to
    message["Subject"] = subject
    message.set_content(str(body))
    with smtplib.SMTP(smtp_host, int(smtp_port), timeout=30) as server:
        server.starttls()
        server.login(username, password)
        server.send_message(message)
    print(f"email sent to {to}")
    return True
"#,
};

pub static MESSAGING_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_send_message",
    required: &["to", "message"],
    optional: &[("channel", ParamDefault::Str("whatsapp"))],
    aliases: &[("message", "body")],
    modules: &["base64", "urllib.parse", "urllib.request"],
    hosts: &["api.twilio.com"],
    credentials: &["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_FROM_NUMBER"],
    path_params: &[],
    definition: r#"def _send_message(variables, to, message, channel):
    if _record("messaging", to=to, message=message, channel=channel):
        print(f"recorded {channel} message to {to}")
        return True
    sid = os.environ.get("TWILIO_ACCOUNT_SID")
    token = os.environ.get("TWILIO_AUTH_TOKEN")
    sender = os.environ.get("TWILIO_FROM_NUMBER")
    if not sid or not token or not sender:
        raise RuntimeError("TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_FROM_NUMBER must be set")
    prefix = "whatsapp:" if channel == "whatsapp" else ""
    form = urllib.parse.urlencode({"From": prefix + sender, "To": prefix + str(to), "Body": str(message)})
    request = urllib.request.Request(
        "https://api.twilio.com/2010-04-01/Accounts/" + sid + "/Messages.json",
        data=form.encode("utf-8"),
        method="POST",
    )
    token_pair = base64.b64encode(f"{sid}:{token}".encode("utf-8")).decode("ascii")
    request.add_header("Authorization", "Basic " + token_pair)
    with urllib.request.urlopen(request, timeout=30) as response:
        response.read()
    print(f"{channel} message sent to {to}")
    return True
"#,
};

pub static WEB_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_call_web",
    required: &["url"],
    optional: &[
        ("method", ParamDefault::Str("GET")),
        ("headers", ParamDefault::EmptyMap),
        ("payload", ParamDefault::None),
        ("store_as", ParamDefault::Str("web_result")),
    ],
    aliases: &[("payload", "data")],
    modules: &["requests"],
    hosts: &[],
    credentials: &[],
    path_params: &[],
    definition: r#"def _call_web(variables, url, method, headers, payload, store_as):
    if _record("web", url=url, method=method, payload=payload):
        variables[store_as] = None
        return None
    response = requests.request(method, url, headers=headers, json=payload, timeout=30)
    response.raise_for_status()
    try:
        result = response.json()
    except ValueError:
        result = response.text
    variables[store_as] = result
    print(f"{method} {url} -> {response.status_code}")
    return result
"#,
};

pub static SCRAPE_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_scrape_web",
    required: &["url"],
    optional: &[
        ("selector", ParamDefault::None),
        ("store_as", ParamDefault::Str("scraped_content")),
    ],
    aliases: &[],
    modules: &["bs4", "requests"],
    hosts: &[],
    credentials: &[],
    path_params: &[],
    definition: r#"def _scrape_web(variables, url, selector, store_as):
    if _record("scrape", url=url, selector=selector):
        print(f"recorded scrape of {url}")
        variables[store_as] = None
        return None
    response = requests.get(url, timeout=30)
    response.raise_for_status()
    soup = bs4.BeautifulSoup(response.content, "html.parser")
    if selector:
        content = [element.get_text().strip() for element in soup.select(selector)]
    else:
        content = soup.get_text().strip()
    variables[store_as] = content
    print(f"scraped {url}")
    return content
"#,
};

pub static FILE_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_process_file",
    required: &["path"],
    optional: &[
        ("operation", ParamDefault::Str("read")),
        ("content", ParamDefault::Str("")),
        ("store_as", ParamDefault::Str("file_content")),
    ],
    aliases: &[("path", "filepath")],
    modules: &["pathlib"],
    hosts: &[],
    credentials: &[],
    path_params: &["path"],
    definition: r#"def _workspace_path(relative):
    root = pathlib.Path(os.environ.get("WIZFLOW_WORKSPACE", ".")).resolve()
    target = (root / str(relative)).resolve()
    if target != root and root not in target.parents:
        raise RuntimeError(f"path {relative} escapes the workspace")
    return target


def _process_file(variables, path, operation, content, store_as):
    target = _workspace_path(path)
    if operation == "read":
        variables[store_as] = target.read_text(encoding="utf-8")
        print(f"read {path}")
    elif operation == "write":
        target.parent.mkdir(parents=True, exist_ok=True)
        target.write_text(str(content), encoding="utf-8")
        print(f"wrote {path}")
    elif operation == "append":
        target.parent.mkdir(parents=True, exist_ok=True)
        with target.open("a", encoding="utf-8") as handle:
            handle.write(str(content))
        print(f"appended to {path}")
    else:
        raise RuntimeError(f"unsupported file operation: {operation}")
    return True
"#,
};

pub static AI_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_summarize",
    required: &["text"],
    optional: &[
        ("max_sentences", ParamDefault::Int(2)),
        ("store_as", ParamDefault::Str("summary")),
    ],
    aliases: &[("text", "input_text")],
    modules: &["re"],
    hosts: &[],
    credentials: &[],
    path_params: &[],
    definition: r#"def _summarize(variables, text, max_sentences, store_as):
    sentences = [part.strip() for part in re.split(r"(?<=[.!?])\s+", str(text)) if part.strip()]
    summary = " ".join(sentences[: int(max_sentences)])
    variables[store_as] = summary
    print(f"summary: {summary}")
    return summary
"#,
};

pub static DATA_TEMPLATE: ActionTemplate = ActionTemplate {
    helper: "_log_data",
    required: &["message"],
    optional: &[
        ("level", ParamDefault::Str("INFO")),
        ("store_as", ParamDefault::None),
    ],
    aliases: &[],
    modules: &[],
    hosts: &[],
    credentials: &[],
    path_params: &[],
    definition: r#"def _log_data(variables, message, level, store_as):
    print(f"[{level}] {message}")
    if store_as:
        variables[store_as] = message
    return message
"#,
};

/// Contract and setup code for one trigger type.
#[derive(Debug)]
pub struct TriggerTemplate {
    pub required: &'static [&'static str],
    pub aliases: &'static [(&'static str, &'static str)],
    pub modules: &'static [&'static str],
    pub path_params: &'static [&'static str],
    /// Lines placed in `main()` after the payload is loaded, indented one level.
    pub setup: &'static [&'static str],
}

impl TriggerTemplate {
    pub fn lookup<'a>(&self, params: &'a Parameters, name: &str) -> Option<&'a Value> {
        if let Some(value) = params.get(name) {
            return Some(value);
        }
        self.aliases
            .iter()
            .filter(|(canonical, _)| *canonical == name)
            .find_map(|(_, alias)| params.get(*alias))
    }

    pub fn missing_required(&self, params: &Parameters) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|name| matches!(self.lookup(params, name), None | Some(Value::Null)))
            .collect()
    }
}

pub fn trigger_template(kind: TriggerType) -> &'static TriggerTemplate {
    match kind {
        TriggerType::Manual => &MANUAL_TRIGGER,
        TriggerType::Schedule => &SCHEDULE_TRIGGER,
        TriggerType::Email => &EMAIL_TRIGGER,
        TriggerType::File => &FILE_TRIGGER,
        TriggerType::Webhook => &WEBHOOK_TRIGGER,
    }
}

static MANUAL_TRIGGER: TriggerTemplate = TriggerTemplate {
    required: &[],
    aliases: &[],
    modules: &[],
    path_params: &[],
    setup: &[],
};

static SCHEDULE_TRIGGER: TriggerTemplate = TriggerTemplate {
    required: &["cron"],
    aliases: &[("cron", "schedule")],
    modules: &["datetime"],
    path_params: &[],
    setup: &[
        "variables[\"triggered_at\"] = datetime.datetime.now(datetime.timezone.utc).isoformat()",
    ],
};

static EMAIL_TRIGGER: TriggerTemplate = TriggerTemplate {
    required: &[],
    aliases: &[],
    modules: &[],
    path_params: &[],
    setup: &["variables.setdefault(\"email\", variables.get(\"trigger\", {}))"],
};

static FILE_TRIGGER: TriggerTemplate = TriggerTemplate {
    required: &["path"],
    aliases: &[],
    modules: &["pathlib"],
    path_params: &["path"],
    setup: &["variables[\"trigger_path\"] = str(pathlib.PurePosixPath(TRIGGER.get(\"path\", \"\")))"],
};

static WEBHOOK_TRIGGER: TriggerTemplate = TriggerTemplate {
    required: &[],
    aliases: &[],
    modules: &[],
    path_params: &[],
    setup: &[
        "variables.setdefault(\"request\", variables.get(\"trigger\", {}))",
        "variables[\"webhook_path\"] = TRIGGER.get(\"path\", \"/hook\")",
    ],
};
