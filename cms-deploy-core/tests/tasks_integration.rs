use cms_deploy_core::adapters::XdtTransformTool;
use cms_deploy_core::config::{DeployConfig, Layer};
use cms_deploy_core::contract::{
    MockCompiler, MockFileOps, MockHttpClient, MockPackageManager, MockScriptHost,
    MockTransformTool, MockXmlEditor, NpmLogLevel, ScriptArg, Toolchain,
};
use cms_deploy_core::error::DeployError;
use cms_deploy_core::tasks::{self, MSBUILD_NAMESPACE, XMLCONFIG_NAMESPACE};
use mockall::Sequence;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn config_in(root: &Path) -> DeployConfig {
    DeployConfig {
        project_folder: root.to_path_buf(),
        foundation_src_folder: root.join("src/Foundation"),
        feature_src_folder: root.join("src/Feature"),
        project_src_folder: root.join("src/Project"),
        publish_web_folder: root.join("web"),
        publish_web_folder_cd: None,
        publish_temp_folder: root.join("output/temp"),
        publish_xconnect_folder: root.join("xconnect"),
        publish_data_folder: root.join("data"),
        unicorn_serialization_folder: root.join("items"),
        sitecore_azure_toolkit_path: None,
        instance_url: "https://cms.local/".to_string(),
        build_configuration: "Release".to_string(),
        content_hub_enabled: false,
        marketing_definitions_api_key: None,
    }
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"x").unwrap();
}

#[tokio::test]
async fn publish_source_projects_visits_every_destination() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.publish_web_folder_cd = Some(root.path().join("web-cd"));

    let feature = root.path().join("src/Feature");
    touch(&feature.join("Accounts/code/Feature.Accounts.csproj"));
    touch(&feature.join("Navigation/code/Feature.Navigation.csproj"));
    touch(&feature.join("Navigation/tests/Feature.Navigation.Tests.csproj"));

    let calls = Arc::new(Mutex::new(Vec::<(PathBuf, String, PathBuf)>::new()));
    let log = calls.clone();
    let mut compiler = MockCompiler::new();
    compiler
        .expect_web_publish()
        .times(4)
        .returning(move |project, configuration, destination| {
            log.lock().unwrap().push((
                project.to_path_buf(),
                configuration.to_string(),
                destination.to_path_buf(),
            ));
            Ok(())
        });

    let tools = Toolchain {
        compiler: Box::new(compiler),
        ..Toolchain::mocked()
    };
    tasks::publish_source_projects(&config, &tools, Layer::Feature, "code")
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    let accounts = feature.join("Accounts/code/Feature.Accounts.csproj");
    let navigation = feature.join("Navigation/code/Feature.Navigation.csproj");
    let web = root.path().join("web");
    let cd = root.path().join("web-cd");
    assert_eq!(
        *calls,
        vec![
            (accounts.clone(), "Release".to_string(), web.clone()),
            (navigation.clone(), "Release".to_string(), web),
            (accounts, "Release".to_string(), cd.clone()),
            (navigation, "Release".to_string(), cd),
        ]
    );
}

#[tokio::test]
async fn publish_source_projects_stops_at_first_compiler_failure() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());
    touch(&root.path().join("src/Project/Site/code/Project.Site.csproj"));
    touch(&root.path().join("src/Project/Zeta/code/Project.Zeta.csproj"));

    let mut compiler = MockCompiler::new();
    compiler
        .expect_web_publish()
        .times(1)
        .returning(|_, _, _| Err("msbuild exited with 1".into()));

    let tools = Toolchain {
        compiler: Box::new(compiler),
        ..Toolchain::mocked()
    };
    let err = tasks::publish_source_projects(&config, &tools, Layer::Project, "code")
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Tool { operation: "web publish", .. }));
}

#[tokio::test]
async fn copy_content_skips_denylisted_output() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());
    let temp = root.path().join("output/temp");
    for name in [
        "Feature.Accounts.dll",
        "Feature.Accounts.PDB",
        "web.config",
        "build.website.deps.json",
        "site.css",
        "Views/Home/Index.cshtml",
        "App_Config/Include/Feature.config",
        "App_Config/Include/Feature.config.xdt",
        "items/home.yml",
    ] {
        touch(&temp.join(name));
    }

    let copied = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let log = copied.clone();
    let expected_base = temp.clone();
    let expected_destination = root.path().join("web");
    let mut files = MockFileOps::new();
    files
        .expect_copy_files()
        .times(1)
        .returning(move |list, destination, base| {
            assert_eq!(destination.to_path_buf(), expected_destination);
            assert_eq!(base.clone(), Some(expected_base.clone()));
            log.lock().unwrap().extend(list.iter().cloned());
            Ok(())
        });

    let tools = Toolchain {
        files: Box::new(files),
        ..Toolchain::mocked()
    };
    tasks::copy_content(&config, &tools).await.unwrap();

    let mut copied = copied.lock().unwrap().clone();
    copied.sort();
    let mut expected = vec![
        temp.join("App_Config/Include/Feature.config"),
        temp.join("Views/Home/Index.cshtml"),
        temp.join("site.css"),
    ];
    expected.sort();
    assert_eq!(copied, expected);
}

#[tokio::test]
async fn sync_unicorn_passes_secret_and_endpoint() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());

    let mut xml = MockXmlEditor::new();
    xml.expect_peek()
        .times(1)
        .withf(|file, xpath, _| {
            file.ends_with("App_config/Include/Unicorn/Unicorn.zSharedSecret.config")
                && xpath.ends_with("authenticationProvider/SharedSecret")
        })
        .returning(|_, _, _| Ok("s3cret".to_string()));

    let seen = Arc::new(Mutex::new(None::<(PathBuf, Vec<ScriptArg>)>));
    let log = seen.clone();
    let mut scripts = MockScriptHost::new();
    scripts
        .expect_run_script()
        .times(1)
        .returning(move |script, args| {
            *log.lock().unwrap() = Some((script.to_path_buf(), args.to_vec()));
            Ok(())
        });

    let tools = Toolchain {
        xml: Box::new(xml),
        scripts: Box::new(scripts),
        ..Toolchain::mocked()
    };
    tasks::sync_unicorn(&config, &tools, Path::new("scripts/Sync.ps1"))
        .await
        .unwrap();

    let (script, args) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(script, root.path().join("scripts/Sync.ps1"));
    assert_eq!(
        args,
        vec![
            ScriptArg::new("secret", "s3cret"),
            ScriptArg::new("url", "https://cms.local/unicorn.aspx"),
        ]
    );
}

#[tokio::test]
async fn sync_unicorn_without_secret_never_runs_the_script() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());

    let mut xml = MockXmlEditor::new();
    xml.expect_peek()
        .returning(|_, _, _| Err("file not found".into()));
    let mut scripts = MockScriptHost::new();
    scripts.expect_run_script().never();

    let tools = Toolchain {
        xml: Box::new(xml),
        scripts: Box::new(scripts),
        ..Toolchain::mocked()
    };
    assert!(tasks::sync_unicorn(&config, &tools, Path::new("Sync.ps1"))
        .await
        .is_err());
}

#[tokio::test]
async fn content_hub_variable_follows_the_flag() {
    for (enabled, expected) in [(true, "Enabled"), (false, "Disabled")] {
        let root = tempdir().unwrap();
        let mut config = config_in(root.path());
        config.content_hub_enabled = enabled;
        let web_config = root.path().join("web/web.config");

        let mut xml = MockXmlEditor::new();
        xml.expect_poke()
            .times(1)
            .withf(move |file, xpath, value, namespaces| {
                file.to_path_buf() == web_config
                    && xpath.contains("contenthub:define")
                    && value.eq(expected)
                    && namespaces.get("patch").map(String::as_str) == Some(XMLCONFIG_NAMESPACE)
            })
            .returning(|_, _, _, _| Ok(()));

        let tools = Toolchain {
            xml: Box::new(xml),
            ..Toolchain::mocked()
        };
        tasks::modify_content_hub_variable(&config, &tools)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn publish_settings_are_copied_pruned_then_pointed_at_instance() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());
    let user_file = root.path().join("publishsettings.targets.user");
    let mut seq = Sequence::new();

    let mut files = MockFileOps::new();
    let copy_target = user_file.clone();
    files
        .expect_copy_file()
        .times(1)
        .in_sequence(&mut seq)
        .withf(move |from, to| {
            from.ends_with("publishsettings.targets") && to.to_path_buf() == copy_target
        })
        .returning(|_, _| Ok(()));

    let mut xml = MockXmlEditor::new();
    xml.expect_remove()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|_, xpath, namespaces| {
            xpath.eq("/ns:Project/ns:Import")
                && namespaces.get("ns").map(String::as_str) == Some(MSBUILD_NAMESPACE)
        })
        .returning(|_, _, _| Ok(()));
    xml.expect_poke()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|_, xpath, value, _| xpath.ends_with("ns:publishUrl") && value.eq("https://cms.local/"))
        .returning(|_, _, _, _| Ok(()));

    let tools = Toolchain {
        files: Box::new(files),
        xml: Box::new(xml),
        ..Toolchain::mocked()
    };
    tasks::modify_publish_settings(&config, &tools).await.unwrap();
}

#[tokio::test]
async fn marketing_definitions_require_an_api_key() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());

    let mut http = MockHttpClient::new();
    http.expect_get().never();
    let tools = Toolchain {
        http: Box::new(http),
        ..Toolchain::mocked()
    };

    let err = tasks::deploy_marketing_definitions(&config, &tools)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Config(_)));
}

#[tokio::test]
async fn marketing_definitions_call_the_instance_with_key() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.marketing_definitions_api_key = Some("abc123".to_string());

    let mut http = MockHttpClient::new();
    http.expect_get()
        .times(1)
        .withf(|url, headers| {
            url.eq("https://cms.local/utilities/deploymarketingdefinitions.aspx?apiKey=abc123")
                && headers
                    .iter()
                    .any(|(k, v)| k == "Connection" && v == "keep-alive")
        })
        .returning(|_, _| Ok("Deployed".to_string()));
    let tools = Toolchain {
        http: Box::new(http),
        ..Toolchain::mocked()
    };

    tasks::deploy_marketing_definitions(&config, &tools)
        .await
        .unwrap();
}

#[tokio::test]
async fn merge_runs_for_package_transforms_then_every_layer() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());

    let sources = Arc::new(Mutex::new(Vec::<(PathBuf, String)>::new()));
    let log = sources.clone();
    let mut transforms = MockTransformTool::new();
    transforms
        .expect_merge()
        .times(4)
        .returning(move |source, parent, target, exclude| {
            assert!(target.ends_with("web"));
            assert_eq!(exclude.to_vec(), vec!["ssl".to_string(), "azure".to_string()]);
            log.lock()
                .unwrap()
                .push((source.to_path_buf(), parent.to_string()));
            Ok(())
        });

    let tools = Toolchain {
        transforms: Box::new(transforms),
        ..Toolchain::mocked()
    };
    tasks::merge_and_copy_xml_transform(&config, &tools, "code")
        .await
        .unwrap();

    assert_eq!(
        *sources.lock().unwrap(),
        vec![
            (root.path().join("output/temp"), "transforms".to_string()),
            (root.path().join("src/Foundation"), "code".to_string()),
            (root.path().join("src/Feature"), "code".to_string()),
            (root.path().join("src/Project"), "code".to_string()),
        ]
    );
}

#[tokio::test]
async fn merge_with_xdt_tool_maps_layer_tree_into_web_root() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());
    let module = config.feature_src_folder.join("Accounts/code");
    fs::create_dir_all(module.join("App_Config/Include/Feature")).unwrap();
    fs::write(
        module.join("App_Config/Include/Feature/Accounts.config.xdt"),
        r#"<configuration xmlns:xdt="http://schemas.microsoft.com/XML-Document-Transform"><sitecore xdt:Transform="InsertIfMissing" /></configuration>"#,
    )
    .unwrap();

    let tools = Toolchain {
        transforms: Box::new(XdtTransformTool::new("xdt-not-installed")),
        ..Toolchain::mocked()
    };
    tasks::merge_and_copy_xml_transform(&config, &tools, "code")
        .await
        .unwrap();

    let web = &config.publish_web_folder;
    assert!(web
        .join("App_Config/Include/Feature/Accounts.config.xdt")
        .is_file());
    assert!(!web.join("Accounts").exists());
}

#[tokio::test]
async fn apply_transform_excludes_encryption_fragments() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());

    let mut transforms = MockTransformTool::new();
    transforms
        .expect_apply()
        .times(3)
        .withf(|_, parent, _, exclude| parent.eq("code") && exclude.to_vec() == vec!["encryption".to_string()])
        .returning(|_, _, _, _| Ok(()));

    let tools = Toolchain {
        transforms: Box::new(transforms),
        ..Toolchain::mocked()
    };
    tasks::apply_xml_transform(&config, &tools, "code")
        .await
        .unwrap();
}

#[tokio::test]
async fn npm_install_skips_retired_themes_and_restores_shrinkwrap() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());
    let frontend = root.path().join("FrontEnd");
    for theme in ["Basic", "-Legacy", "Corporate"] {
        touch(&frontend.join(theme).join("package.json"));
    }

    let installed = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
    let log = installed.clone();
    let mut packages = MockPackageManager::new();
    packages
        .expect_install()
        .times(2)
        .returning(move |dir, level| {
            assert_eq!(level, NpmLogLevel::Warn);
            log.lock().unwrap().push(dir.to_path_buf());
            Ok(())
        });

    let mut files = MockFileOps::new();
    files
        .expect_delete_file()
        .times(2)
        .withf(|file| file.ends_with("npm-shrinkwrap.json"))
        .returning(|_| Ok(()));
    files
        .expect_copy_file()
        .times(2)
        .withf(|from, to| {
            from.ends_with("npm-shrinkwrap.template.json") && to.ends_with("npm-shrinkwrap.json")
        })
        .returning(|_, _| Ok(()));

    let tools = Toolchain {
        files: Box::new(files),
        packages: Box::new(packages),
        ..Toolchain::mocked()
    };
    tasks::front_end_npm_install(&config, &tools, Path::new("FrontEnd"))
        .await
        .unwrap();

    assert_eq!(
        *installed.lock().unwrap(),
        vec![frontend.join("Basic"), frontend.join("Corporate")]
    );
}

#[tokio::test]
async fn npm_build_runs_build_script_in_each_theme() {
    let root = tempdir().unwrap();
    let config = config_in(root.path());
    let frontend = root.path().join("themes");
    touch(&frontend.join("Basic/package.json"));

    let mut packages = MockPackageManager::new();
    packages
        .expect_run_script()
        .times(1)
        .withf(|dir, script, level| {
            dir.ends_with("themes/Basic") && script.eq("build") && *level == NpmLogLevel::Info
        })
        .returning(|_, _, _| Ok(()));

    let tools = Toolchain {
        packages: Box::new(packages),
        ..Toolchain::mocked()
    };
    tasks::front_end_npm_build(&config, &tools, &frontend)
        .await
        .unwrap();
}

#[tokio::test]
async fn dacpac_generation_passes_package_paths() {
    let root = tempdir().unwrap();
    let mut config = config_in(root.path());
    config.sitecore_azure_toolkit_path = Some(PathBuf::from("/opt/toolkit"));

    let seen = Arc::new(Mutex::new(Vec::<ScriptArg>::new()));
    let log = seen.clone();
    let mut scripts = MockScriptHost::new();
    scripts
        .expect_run_script()
        .times(1)
        .returning(move |_, args| {
            log.lock().unwrap().extend(args.iter().cloned());
            Ok(())
        });

    let tools = Toolchain {
        scripts: Box::new(scripts),
        ..Toolchain::mocked()
    };
    tasks::generate_dacpacs(&config, &tools, Path::new("scripts/Dacpac.ps1"))
        .await
        .unwrap();

    let names: Vec<String> = seen.lock().unwrap().iter().map(|a| a.name.clone()).collect();
    assert_eq!(
        names,
        vec![
            "SitecoreAzureToolkitPath",
            "updatePackagePath",
            "securityPackagePath",
            "destinationPath",
        ]
    );
    assert_eq!(seen.lock().unwrap()[0].value, "/opt/toolkit");
}
