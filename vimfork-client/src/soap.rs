//! SOAP client for the vSphere management endpoint.
//!
//! Speaks just enough of the vim25 wire protocol for fork orchestration:
//! session login, container-view inventory search, single-object property
//! retrieval, the fork task submissions, and guest program start. Request
//! bodies are composed per method; responses are scanned with the helpers
//! in [`crate::xml`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use url::Url;

use vimfork_core::{
    GuestCredentials, GuestProgramSpec, ManagedObjectRef, PowerState, TaskHandle, TaskStatus,
    VimError, VirtualMachine,
};

use crate::client::VimClient;
use crate::xml;

const SOAP_ACTION: &str = "urn:vim25/6.7";

/// Well-known manager morefs from the service content, fetched once at
/// connect time.
#[derive(Debug, Clone)]
struct ServiceContent {
    session_manager: ManagedObjectRef,
    property_collector: ManagedObjectRef,
    view_manager: ManagedObjectRef,
    root_folder: ManagedObjectRef,
    guest_operations: ManagedObjectRef,
}

/// Authenticated session against a vCenter/ESX SOAP endpoint.
///
/// The session cookie lives in the HTTP client's cookie store; every
/// [`VirtualMachine`] resolved through this client is only meaningful while
/// this session is alive.
pub struct SoapClient {
    http: reqwest::Client,
    endpoint: Url,
    content: ServiceContent,
    /// Default datacenter scoping inventory searches, resolved lazily at
    /// most once per client. Concurrent first use is serialized by the cell.
    datacenter: OnceCell<ManagedObjectRef>,
}

impl SoapClient {
    /// Connect to `endpoint` (the SDK URL, e.g. `https://host/sdk`) and log
    /// in. With `insecure`, TLS certificate verification is disabled.
    ///
    /// # Errors
    /// [`VimError::InvalidEndpoint`] for an unparseable URL,
    /// [`VimError::Fault`] for rejected credentials, transport errors
    /// otherwise.
    pub async fn connect(
        endpoint: &str,
        username: &str,
        password: &str,
        insecure: bool,
    ) -> Result<Self, VimError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| VimError::InvalidEndpoint(e.to_string()))?;
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| VimError::Transport(e.to_string()))?;

        let content = retrieve_service_content(&http, &endpoint).await?;
        let client = Self {
            http,
            endpoint,
            content,
            datacenter: OnceCell::new(),
        };
        client.login(username, password).await?;
        Ok(client)
    }

    async fn login(&self, username: &str, password: &str) -> Result<(), VimError> {
        let body = format!(
            r#"<Login xmlns="urn:vim25">{this}<userName>{user}</userName><password>{pass}</password></Login>"#,
            this = this_ref(&self.content.session_manager),
            user = xml::escape(username),
            pass = xml::escape(password),
        );
        self.call(&body).await?;
        tracing::debug!(user = username, endpoint = %self.endpoint, "logged in");
        Ok(())
    }

    async fn call(&self, body: &str) -> Result<String, VimError> {
        post(&self.http, &self.endpoint, body).await
    }

    /// Read properties of a single object. Returns the raw response body
    /// for the caller to scan.
    async fn retrieve_properties(
        &self,
        obj: &ManagedObjectRef,
        paths: &[&str],
    ) -> Result<String, VimError> {
        let path_set: String = paths
            .iter()
            .map(|p| format!("<pathSet>{p}</pathSet>"))
            .collect();
        let body = format!(
            r#"<RetrievePropertiesEx xmlns="urn:vim25">{this}<specSet><propSet><type>{kind}</type>{path_set}</propSet><objectSet><obj type="{kind}">{value}</obj></objectSet></specSet><options/></RetrievePropertiesEx>"#,
            this = this_ref(&self.content.property_collector),
            kind = xml::escape(&obj.kind),
            value = xml::escape(&obj.value),
        );
        self.call(&body).await
    }

    /// Submit a task-returning method and wrap the returned task moref.
    async fn submit(&self, body: &str, op: &str) -> Result<TaskHandle, VimError> {
        let text = self.call(body).await?;
        let task = xml::tag_content(&text, "returnval")
            .ok_or_else(|| VimError::Protocol(format!("{op}: no task in response")))?;
        let handle = TaskHandle::new(ManagedObjectRef::new("Task", task.trim()));
        tracing::debug!(%op, task = %handle, "task submitted");
        Ok(handle)
    }

    /// The default datacenter for this session, resolved on first use.
    async fn default_datacenter(&self) -> Result<&ManagedObjectRef, VimError> {
        self.datacenter
            .get_or_try_init(|| async {
                let mut found = self
                    .container_search(&self.content.root_folder, "Datacenter")
                    .await?;
                match found.len() {
                    0 => Err(VimError::LookupFailed("no datacenter in inventory".to_owned())),
                    1 => {
                        let (moref, name) = found.remove(0);
                        tracing::debug!(datacenter = %name, moref = %moref, "default datacenter");
                        Ok(moref)
                    }
                    n => Err(VimError::LookupFailed(format!(
                        "{n} datacenters in inventory, cannot pick a default"
                    ))),
                }
            })
            .await
    }

    /// List `(moref, name)` for every object of `kind` under `root`, via a
    /// transient container view.
    async fn container_search(
        &self,
        root: &ManagedObjectRef,
        kind: &str,
    ) -> Result<Vec<(ManagedObjectRef, String)>, VimError> {
        let body = format!(
            r#"<CreateContainerView xmlns="urn:vim25">{this}<container type="{root_kind}">{root_value}</container><type>{kind}</type><recursive>true</recursive></CreateContainerView>"#,
            this = this_ref(&self.content.view_manager),
            root_kind = xml::escape(&root.kind),
            root_value = xml::escape(&root.value),
        );
        let text = self.call(&body).await?;
        let view = xml::tag_content(&text, "returnval")
            .ok_or_else(|| VimError::LookupFailed("container view not created".to_owned()))?
            .trim()
            .to_owned();

        // TODO: follow the RetrievePropertiesEx continuation token for
        // inventories larger than one result page.
        let body = format!(
            r#"<RetrievePropertiesEx xmlns="urn:vim25">{this}<specSet><propSet><type>{kind}</type><pathSet>name</pathSet></propSet><objectSet><obj type="ContainerView">{view}</obj><skip>true</skip><selectSet xsi:type="TraversalSpec"><name>view</name><type>ContainerView</type><path>view</path><skip>false</skip></selectSet></objectSet></specSet><options/></RetrievePropertiesEx>"#,
            this = this_ref(&self.content.property_collector),
        );
        let result = self.call(&body).await;

        // The view is transient; drop it regardless of the retrieve outcome.
        let destroy = format!(
            r#"<DestroyView xmlns="urn:vim25"><_this type="ContainerView">{view}</_this></DestroyView>"#
        );
        if let Err(e) = self.call(&destroy).await {
            tracing::debug!(error = %e, "container view cleanup failed");
        }

        let text = result?;
        let mut out = Vec::new();
        for block in xml::tag_blocks(&text, "objects") {
            let Some(obj) = xml::tag_content(block, "obj") else {
                continue;
            };
            let Some(name) = xml::tag_content(block, "val") else {
                continue;
            };
            out.push((
                ManagedObjectRef::new(kind, obj.trim()),
                xml::unescape(name.trim()),
            ));
        }
        Ok(out)
    }

    /// The guest process manager for this session.
    async fn process_manager(&self) -> Result<ManagedObjectRef, VimError> {
        let text = self
            .retrieve_properties(&self.content.guest_operations, &["processManager"])
            .await?;
        let value = xml::tag_content(&text, "val")
            .ok_or_else(|| VimError::Protocol("no guest process manager".to_owned()))?;
        Ok(ManagedObjectRef::new("GuestProcessManager", value.trim()))
    }
}

#[async_trait]
impl VimClient for SoapClient {
    async fn find_vm(&self, name: &str) -> Result<VirtualMachine, VimError> {
        let datacenter = self.default_datacenter().await?.clone();
        let vms = self.container_search(&datacenter, "VirtualMachine").await?;
        let mut matched: Vec<ManagedObjectRef> = vms
            .into_iter()
            .filter(|(_, n)| n == name)
            .map(|(moref, _)| moref)
            .collect();
        match matched.len() {
            0 => Err(VimError::NotFound {
                name: name.to_owned(),
            }),
            1 => {
                let moref = matched.remove(0);
                tracing::debug!(vm = name, moref = %moref, "resolved virtual machine");
                Ok(VirtualMachine::new(name, moref))
            }
            count => Err(VimError::AmbiguousName {
                name: name.to_owned(),
                count,
            }),
        }
    }

    async fn power_state(&self, vm: &ManagedObjectRef) -> Result<PowerState, VimError> {
        let text = self
            .retrieve_properties(vm, &["summary.runtime.powerState"])
            .await?;
        let value = xml::tag_content(&text, "val")
            .ok_or_else(|| VimError::Protocol("no power state in response".to_owned()))?;
        PowerState::parse(value.trim())
            .ok_or_else(|| VimError::Protocol(format!("unknown power state {value:?}")))
    }

    async fn quiesced_fork_parent(
        &self,
        vm: &ManagedObjectRef,
    ) -> Result<Option<bool>, VimError> {
        let text = self
            .retrieve_properties(vm, &["summary.runtime.quiescedForkParent"])
            .await?;
        // Endpoints that predate the fork feature omit the property.
        Ok(xml::tag_content(&text, "val").map(|v| v.trim() == "true" || v.trim() == "1"))
    }

    async fn power_on(&self, vm: &ManagedObjectRef) -> Result<TaskHandle, VimError> {
        let body = format!(
            r#"<PowerOnVM_Task xmlns="urn:vim25">{this}</PowerOnVM_Task>"#,
            this = this_ref(vm),
        );
        self.submit(&body, "PowerOnVM_Task").await
    }

    async fn enable_fork_parent(&self, vm: &ManagedObjectRef) -> Result<TaskHandle, VimError> {
        let body = format!(
            r#"<EnableForkParent_Task xmlns="urn:vim25">{this}</EnableForkParent_Task>"#,
            this = this_ref(vm),
        );
        self.submit(&body, "EnableForkParent_Task").await
    }

    async fn create_fork_child(
        &self,
        vm: &ManagedObjectRef,
        name: &str,
        persistent: bool,
    ) -> Result<TaskHandle, VimError> {
        let body = format!(
            r#"<CreateForkChild_Task xmlns="urn:vim25">{this}<name>{name}</name><spec><persistent>{persistent}</persistent></spec></CreateForkChild_Task>"#,
            this = this_ref(vm),
            name = xml::escape(name),
        );
        self.submit(&body, "CreateForkChild_Task").await
    }

    async fn task_status(&self, task: &TaskHandle) -> Result<TaskStatus, VimError> {
        let text = self
            .retrieve_properties(task.moref(), &["info.state", "info.error.localizedMessage"])
            .await?;
        let mut state = None;
        let mut fault = None;
        for block in xml::tag_blocks(&text, "propSet") {
            let Some(prop) = xml::tag_content(block, "name") else {
                continue;
            };
            let value = xml::tag_content(block, "val").map(|v| xml::unescape(v.trim()));
            match prop.trim() {
                "info.state" => state = value,
                "info.error.localizedMessage" => fault = value,
                _ => {}
            }
        }
        let state =
            state.ok_or_else(|| VimError::Protocol("no task state in response".to_owned()))?;
        TaskStatus::parse(&state, fault)
            .ok_or_else(|| VimError::Protocol(format!("unknown task state {state:?}")))
    }

    async fn start_guest_program(
        &self,
        vm: &ManagedObjectRef,
        auth: &GuestCredentials,
        program: &GuestProgramSpec,
    ) -> Result<i64, VimError> {
        let pm = self.process_manager().await?;
        let body = format!(
            r#"<StartProgramInGuest xmlns="urn:vim25">{this}<vm type="{vm_kind}">{vm_value}</vm><auth xsi:type="NamePasswordAuthentication"><interactiveSession>false</interactiveSession><username>{user}</username><password>{pass}</password></auth><spec><programPath>{path}</programPath><arguments>{args}</arguments></spec></StartProgramInGuest>"#,
            this = this_ref(&pm),
            vm_kind = xml::escape(&vm.kind),
            vm_value = xml::escape(&vm.value),
            user = xml::escape(&auth.username),
            pass = xml::escape(&auth.password),
            path = xml::escape(&program.program_path),
            args = xml::escape(&program.arguments),
        );
        let text = self.call(&body).await?;
        let pid = xml::tag_content(&text, "returnval")
            .ok_or_else(|| VimError::Protocol("no pid in response".to_owned()))?;
        pid.trim()
            .parse::<i64>()
            .map_err(|_| VimError::Protocol(format!("unparseable pid {pid:?}")))
    }
}

/// The `_this` argument every vim25 method starts with.
fn this_ref(moref: &ManagedObjectRef) -> String {
    format!(
        r#"<_this type="{}">{}</_this>"#,
        xml::escape(&moref.kind),
        xml::escape(&moref.value)
    )
}

/// One SOAP exchange. Checks for a fault before the HTTP status: the
/// endpoint reports faults with a 500 status, and the fault text is the
/// useful part.
async fn post(http: &reqwest::Client, endpoint: &Url, body: &str) -> Result<String, VimError> {
    let envelope = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:xsd="http://www.w3.org/2001/XMLSchema"><soapenv:Body>{body}</soapenv:Body></soapenv:Envelope>"#
    );
    let response = http
        .post(endpoint.clone())
        .header("Content-Type", "text/xml; charset=utf-8")
        .header("SOAPAction", SOAP_ACTION)
        .body(envelope)
        .send()
        .await
        .map_err(|e| VimError::Transport(e.to_string()))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| VimError::Transport(e.to_string()))?;

    if let Some(fault) = xml::tag_content(&text, "faultstring") {
        return Err(VimError::Fault(xml::unescape(fault.trim())));
    }
    if !status.is_success() {
        return Err(VimError::Transport(format!("HTTP {status} from endpoint")));
    }
    Ok(text)
}

async fn retrieve_service_content(
    http: &reqwest::Client,
    endpoint: &Url,
) -> Result<ServiceContent, VimError> {
    let body = r#"<RetrieveServiceContent xmlns="urn:vim25"><_this type="ServiceInstance">ServiceInstance</_this></RetrieveServiceContent>"#;
    let text = post(http, endpoint, body).await?;
    let content = xml::tag_content(&text, "returnval")
        .ok_or_else(|| VimError::Protocol("no service content in response".to_owned()))?;
    Ok(ServiceContent {
        session_manager: content_ref(content, "sessionManager", "SessionManager")?,
        property_collector: content_ref(content, "propertyCollector", "PropertyCollector")?,
        view_manager: content_ref(content, "viewManager", "ViewManager")?,
        root_folder: content_ref(content, "rootFolder", "Folder")?,
        guest_operations: content_ref(content, "guestOperationsManager", "GuestOperationsManager")?,
    })
}

fn content_ref(content: &str, tag: &str, kind: &str) -> Result<ManagedObjectRef, VimError> {
    xml::tag_content(content, tag)
        .map(|value| ManagedObjectRef::new(kind, value.trim()))
        .ok_or_else(|| VimError::Protocol(format!("service content missing {tag}")))
}
