mod deploy_tests;
mod manifest_tests;
