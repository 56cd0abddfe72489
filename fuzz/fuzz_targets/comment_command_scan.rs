#![no_main]

use libfuzzer_sys::fuzz_target;
use ocabot_commands::{
    parse_commands, scan_invocations, CommandRegistry, InvocationContext, PscRepository,
    RepositoryIdentity,
};

fuzz_target!(|data: &[u8]| {
    let body = String::from_utf8_lossy(data);

    for invocation in scan_invocations(&body) {
        assert!(!invocation.command.is_empty());
        assert!(invocation
            .command
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_'));
        assert!(invocation.options.iter().all(|option| !option.is_empty()));
    }

    let registry = CommandRegistry::new(PscRepository::parse("OCA/oca-psc").ok().flatten());
    let repository = RepositoryIdentity::new("OCA", "oca-psc");
    for context in [
        InvocationContext::pull_request(repository.clone(), "fuzzer"),
        InvocationContext::issue(repository, "fuzzer"),
    ] {
        let first = parse_commands(&body, &context, &registry).collect::<Vec<_>>();
        let second = parse_commands(&body, &context, &registry).collect::<Vec<_>>();
        assert_eq!(first, second);
        if !context.is_pull_request {
            assert!(first
                .iter()
                .all(|parsed| parsed.as_ref().map_or_else(|error| error.is_options_error(), |_| true)));
        }
    }
});
