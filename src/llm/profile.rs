use crate::config::ProfileKind;

use super::models::IssueCandidate;

/// Placeholder the prompt template must contain.
pub const MARKDOWN_PLACEHOLDER: &str = "{markdown_content}";

/// Everything that differs between generation presets: the prompt, the
/// sample document, the static fallback batch and the completion limits.
#[derive(Debug, Clone)]
pub struct GenerationProfile {
    pub name: &'static str,
    pub prompt_template: String,
    pub sample_markdown: String,
    pub fallback_issues: Vec<IssueCandidate>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationProfile {
    pub fn for_kind(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Standard => Self::standard(),
            ProfileKind::Extended => Self::extended(),
        }
    }

    /// 15-25 tasks per document, three fallback issues.
    pub fn standard() -> Self {
        Self {
            name: "standard",
            prompt_template: prompt_template("15-25", "Each task should take 1-3 days to implement."),
            sample_markdown: SAMPLE_MARKDOWN.to_string(),
            fallback_issues: standard_fallback(),
            max_tokens: 4000,
            temperature: 0.2,
        }
    }

    /// Up to ~60 finer-grained tasks, five fallback issues.
    pub fn extended() -> Self {
        Self {
            name: "extended",
            prompt_template: prompt_template(
                "up to 60",
                "Each task should take at most 1 day to implement; split larger work further.",
            ),
            sample_markdown: SAMPLE_MARKDOWN.to_string(),
            fallback_issues: extended_fallback(),
            max_tokens: 16000,
            temperature: 0.2,
        }
    }

    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_fallback_issues(mut self, issues: Vec<IssueCandidate>) -> Self {
        self.fallback_issues = issues;
        self
    }

    /// Embed `markdown` into the prompt template.
    pub fn build_prompt(&self, markdown: &str) -> Result<String, String> {
        if !self.prompt_template.contains(MARKDOWN_PLACEHOLDER) {
            return Err(format!(
                "prompt template for profile '{}' has no {} placeholder",
                self.name, MARKDOWN_PLACEHOLDER
            ));
        }
        Ok(self
            .prompt_template
            .replacen(MARKDOWN_PLACEHOLDER, markdown, 1))
    }
}

fn prompt_template(task_count: &str, sizing: &str) -> String {
    format!(
        r###"You are an experienced software engineer and tech lead.
Break the requirements document below into concrete tasks that an implementer can pick up and build.

## How to decompose
1. **Granularity**: {sizing}
2. **Technical area**: group by frontend, backend, database, infrastructure, testing and so on.
3. **Dependencies**: note prerequisite tasks and tasks that can run in parallel.
4. **Technical detail**: name the technologies, architecture and implementation patterns.
5. **Acceptance criteria**: testable, verifiable conditions at the code level.

## Task categories
- 🏗️ **Infrastructure**: Docker, CI/CD, deployment
- 🎨 **Frontend**: UI/UX, components, state management
- ⚙️ **Backend**: APIs, business logic, authentication
- 🗄️ **Database**: schema design, migrations, query tuning
- 🧪 **Testing**: unit, integration, E2E, performance
- 📚 **Documentation**: API reference, design notes, runbooks
- 🔧 **Configuration**: performance, security, monitoring

## Granularity guide
- ❌ Too coarse: "Implement user authentication"
- ✅ Right size: "Implement JWT auth middleware", "Build the login screen UI", "Write tests for the auth API"

## Output format (JSON)
{{
  "issues": [
    {{
      "title": "🎨 Frontend: implement the login form component",
      "body": "## Overview\nImplement the login form.\n\n## Technical details\n- React + TypeScript\n- Form validation\n\n## Acceptance criteria\n- [ ] Required fields are validated\n- [ ] The submit button is disabled while the request is in flight\n- [ ] Error responses are shown to the user\n\n## Files\n- `components/auth/LoginForm.tsx`\n\n## Dependencies\n- Requires: auth API endpoint",
      "labels": ["frontend", "component", "auth", "priority-high"],
      "priority": 1
    }}
  ]
}}

`priority` is an integer from 1 (most urgent) to 5.

## Requirements document
{placeholder}

**Important**:
- Produce {task_count} concrete tasks.
- {sizing}
- Include technical implementation details.
- Assume realistic file names and directory layout.
- Respond with the JSON object only, no explanations."###,
        sizing = sizing,
        task_count = task_count,
        placeholder = MARKDOWN_PLACEHOLDER,
    )
}

fn standard_fallback() -> Vec<IssueCandidate> {
    vec![
        IssueCandidate::new(
            "🔧 Project setup",
            "## Overview\nSet up the project.\n\n## Acceptance criteria\n- [ ] Development environment is ready\n- [ ] Basic project structure exists\n- [ ] Dependencies are configured\n\n## Hints\nStart from an existing project template to move quickly.",
            &["setup", "priority-high"],
            1,
        ),
        IssueCandidate::new(
            "📚 Documentation",
            "## Overview\nWrite the project documentation.\n\n## Acceptance criteria\n- [ ] README.md\n- [ ] API reference\n- [ ] Development guide\n\n## Hints\nKeep everything in Markdown and consider generating the API reference.",
            &["documentation", "priority-medium"],
            2,
        ),
        IssueCandidate::new(
            "✨ Core features",
            "## Overview\nImplement the core features of the application.\n\n## Acceptance criteria\n- [ ] Basic UI structure\n- [ ] API endpoints\n- [ ] Database design\n\n## Hints\nStart with an MVP and grow from there.",
            &["enhancement", "priority-high"],
            1,
        ),
    ]
}

fn extended_fallback() -> Vec<IssueCandidate> {
    let mut issues = standard_fallback();
    issues.push(IssueCandidate::new(
        "🏗️ CI/CD pipeline",
        "## Overview\nAutomate build, test and deployment.\n\n## Acceptance criteria\n- [ ] Tests run on every pull request\n- [ ] Main branch deploys automatically\n- [ ] Build status is visible in the README",
        &["infrastructure", "ci", "priority-medium"],
        2,
    ));
    issues.push(IssueCandidate::new(
        "🧪 Test foundation",
        "## Overview\nSet up the testing foundation.\n\n## Acceptance criteria\n- [ ] Unit test runner configured\n- [ ] Integration tests for the main API\n- [ ] Coverage report generated in CI",
        &["testing", "priority-medium"],
        3,
    ));
    issues
}

/// Built-in requirements document used when the caller sends none.
pub const SAMPLE_MARKDOWN: &str = r#"# E-commerce Site Renewal Project

## Project overview
Rebuild the existing e-commerce site on a modern stack to improve usability and performance.

## Functional requirements

### 1. User authentication
- Sign-up and login
- Social login (Google, Facebook)
- Password reset
- Profile management

### 2. Product management
- Product listing (search and filtering)
- Product detail page
- Reviews and ratings
- Inventory management

### 3. Shopping cart
- Add and remove items
- Change quantities
- Total price calculation
- Cart persists across sessions

## Technical requirements

### Frontend
- React 18 + TypeScript
- Tailwind CSS + DaisyUI
- Responsive design

### Backend
- REST API
- PostgreSQL
- Redis (session storage)

## Constraints
- Development period: 3 months
- Limited budget
- Existing data must be migrated"#;
