use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::{PrimaryStore, RawProblemData};
use crate::domain::ids::{JobId, OrgId};
use crate::error::{Error, Result};

/// Production `PrimaryStore` backed by Postgres. Pool is constructed once
/// at process start (spec §5: "pool survives across jobs in the same
/// process") and cloned cheaply per job.
#[derive(Debug, Clone)]
pub struct SqlxPrimaryStore {
    pool: PgPool,
}

impl SqlxPrimaryStore {
    pub fn new(pool: PgPool) -> Self {
        SqlxPrimaryStore { pool }
    }
}

#[async_trait]
impl PrimaryStore for SqlxPrimaryStore {
    async fn fetch_problem_data(&self, org_id: &OrgId, semester: u8) -> Result<RawProblemData> {
        let semester = semester as i16;

        let courses_fut = sqlx::query_scalar::<_, Value>(
            "select coalesce(jsonb_agg(row_to_json(c)), '[]'::jsonb) from (
                select co.*, array_agg(ce.student_id) filter (where ce.student_id is not null) as student_ids
                from course_offerings co
                join courses c2 on c2.id = co.course_id
                left join course_enrollments ce on ce.offering_id = co.id
                where c2.organization_id = $1 and co.semester = $2
                group by co.id
            ) c",
        )
        .bind(&org_id.id)
        .bind(semester)
        .fetch_one(&self.pool);

        let faculty_fut = sqlx::query_scalar::<_, Value>(
            "select coalesce(jsonb_agg(row_to_json(f)), '[]'::jsonb) from faculty f where f.organization_id = $1",
        )
        .bind(&org_id.id)
        .fetch_one(&self.pool);

        let rooms_fut = sqlx::query_scalar::<_, Value>(
            "select coalesce(jsonb_agg(row_to_json(r)), '[]'::jsonb) from rooms r where r.organization_id = $1",
        )
        .bind(&org_id.id)
        .fetch_one(&self.pool);

        let students_fut = sqlx::query_scalar::<_, Value>(
            "select coalesce(jsonb_agg(row_to_json(s)), '[]'::jsonb) from students s where s.organization_id = $1",
        )
        .bind(&org_id.id)
        .fetch_one(&self.pool);

        let time_config_fut = sqlx::query_scalar::<_, Option<Value>>(
            "select row_to_json(tc) from timetable_configurations tc
             where tc.organization_id = $1 and tc.semester = $2",
        )
        .bind(&org_id.id)
        .bind(semester)
        .fetch_one(&self.pool);

        // Fan out all five reads at once (spec §4.1: "Fetches five data sets
        // in parallel from the primary store").
        let (courses, faculty, rooms, students, time_config) =
            tokio::try_join!(courses_fut, faculty_fut, rooms_fut, students_fut, time_config_fut)?;

        let time_config = time_config.ok_or_else(|| Error::DataLoad {
            org_id: org_id.id.clone(),
            reason: "no timetable_configurations row for organization/semester".to_string(),
        })?;

        Ok(RawProblemData {
            courses,
            faculty,
            rooms,
            students,
            time_config,
        })
    }

    async fn update_job(
        &self,
        job_id: &JobId,
        status: &str,
        progress: u8,
        timetable_data: Option<Value>,
        error_message: Option<String>,
    ) -> Result<()> {
        sqlx::query(
            "update generation_jobs
             set status = $2, progress = $3, timetable_data = $4, error_message = $5,
                 completed_at = case when $2 in ('completed', 'partial_success', 'failed', 'cancelled')
                                 then now() else completed_at end,
                 updated_at = now()
             where id = $1",
        )
        .bind(job_id.as_str())
        .bind(status)
        .bind(progress as i16)
        .bind(timetable_data)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn PrimaryStore> {
        Box::new(self.clone())
    }
}
