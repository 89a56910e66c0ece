// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::QueryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefinition {
    pub id: QueryId,
    pub title: &'static str,
    pub description: &'static str,
    pub fields: &'static [FieldSpec],
}

impl QueryDefinition {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

const COURSE_ID: FieldSpec = FieldSpec {
    name: "courseId",
    label: "ID del curso",
    placeholder: "Ejemplo: CS-101",
};

const STUDENT_ID: FieldSpec = FieldSpec {
    name: "studentId",
    label: "ID del estudiante",
    placeholder: "Ejemplo: 12345",
};

const SECTION_ID: FieldSpec = FieldSpec {
    name: "sectionId",
    label: "ID de la sección",
    placeholder: "Ejemplo: 1",
};

const BUILDING: FieldSpec = FieldSpec {
    name: "building",
    label: "Nombre del edificio",
    placeholder: "Ejemplo: Watson",
};

const STUDENT_NAME: FieldSpec = FieldSpec {
    name: "studentName",
    label: "Nombre del estudiante",
    placeholder: "Ejemplo: Zhang",
};

const COURSE_NAME: FieldSpec = FieldSpec {
    name: "courseName",
    label: "Nombre o ID del curso",
    placeholder: "Ejemplo: Database Systems",
};

const ADVISOR_NAME: FieldSpec = FieldSpec {
    name: "professorName",
    label: "Nombre del profesor",
    placeholder: "Ejemplo: Smith",
};

const INSTRUCTOR_NAME: FieldSpec = FieldSpec {
    name: "professorName",
    label: "Nombre del profesor",
    placeholder: "Ejemplo: Brown",
};

const DEPARTMENT_NAME: FieldSpec = FieldSpec {
    name: "departmentName",
    label: "Nombre del departamento",
    placeholder: "Ejemplo: Comp. Sci.",
};

pub const CATALOG: [QueryDefinition; 10] = [
    QueryDefinition {
        id: QueryId::new(1),
        title: "Prerrequisitos de un curso",
        description: "Encontrar los prerrequisitos de un curso. Si el curso no existe, el servidor responde con un mensaje indicándolo.",
        fields: &[COURSE_ID],
    },
    QueryDefinition {
        id: QueryId::new(2),
        title: "Historial académico de un estudiante",
        description: "Obtener el historial académico completo (transcript) de un estudiante a partir de su ID.",
        fields: &[STUDENT_ID],
    },
    QueryDefinition {
        id: QueryId::new(3),
        title: "Detalles de una sección",
        description: "Encontrar los detalles (horario y aula) de una sección específica.",
        fields: &[SECTION_ID],
    },
    QueryDefinition {
        id: QueryId::new(4),
        title: "Secciones de un edificio",
        description: "Encontrar todas las secciones que se imparten en un edificio.",
        fields: &[BUILDING],
    },
    QueryDefinition {
        id: QueryId::new(5),
        title: "Estudiante y su asesor",
        description: "Encontrar el nombre de un estudiante y el nombre de su asesor.",
        fields: &[STUDENT_NAME],
    },
    QueryDefinition {
        id: QueryId::new(6),
        title: "Estudiantes con 'A' en un curso",
        description: "Encontrar a todos los estudiantes que obtuvieron una 'A' en un curso.",
        fields: &[COURSE_NAME],
    },
    QueryDefinition {
        id: QueryId::new(7),
        title: "Estudiantes asesorados por un profesor",
        description: "Encontrar los nombres de todos los estudiantes asesorados por un profesor.",
        fields: &[ADVISOR_NAME],
    },
    QueryDefinition {
        id: QueryId::new(8),
        title: "Cursos impartidos por un profesor",
        description: "Encontrar todos los cursos (título, horario y aula) que imparte un profesor.",
        fields: &[INSTRUCTOR_NAME],
    },
    QueryDefinition {
        id: QueryId::new(9),
        title: "Salario promedio por departamento",
        description: "Calcular el salario promedio por departamento.",
        fields: &[],
    },
    QueryDefinition {
        id: QueryId::new(10),
        title: "Estudiantes del depto. X con > 90 créditos",
        description: "Encontrar todos los estudiantes de un departamento con más de 90 créditos.",
        fields: &[DEPARTMENT_NAME],
    },
];

pub fn all() -> &'static [QueryDefinition] {
    &CATALOG
}

pub fn lookup(id: QueryId) -> Option<&'static QueryDefinition> {
    CATALOG.iter().find(|definition| definition.id == id)
}
